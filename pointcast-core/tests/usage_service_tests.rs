// File: pointcast-core/tests/usage_service_tests.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use pointcast_common::models::{month_anchor, PlanTier, StreamerAccount, UsageCounters};
use pointcast_common::traits::repository_traits::{AccountRepository, UsageRepository};
use pointcast_core::services::UsageService;
use pointcast_core::test_utils::{MemoryAccountRepository, MemoryUsageRepository};

const MIB: i64 = 1024 * 1024;

fn service(
    usage: Arc<MemoryUsageRepository>,
    accounts: Arc<MemoryAccountRepository>,
) -> UsageService {
    UsageService::new(usage, accounts)
}

fn seeded(usage: &MemoryUsageRepository, streamer_id: &str) -> UsageCounters {
    let counters = UsageCounters::fresh(streamer_id, month_anchor(Utc::now()));
    usage.seed(counters.clone());
    counters
}

#[tokio::test]
async fn first_read_creates_and_persists_fresh_counters() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));

    let counters = svc.current_counters("42").await.unwrap();
    assert_eq!(counters.alerts_count, 0);
    assert_eq!(counters.month_anchor, month_anchor(Utc::now()));
    assert!(usage.get_counters("42").await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_account_is_gated_at_the_free_tier() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));

    let mut counters = seeded(&usage, "42");
    counters.alerts_count = 2;
    usage.seed(counters);
    assert!(svc.can_create_alert("42").await.unwrap());

    let mut counters = svc.current_counters("42").await.unwrap();
    counters.alerts_count = 3;
    usage.seed(counters);
    assert!(!svc.can_create_alert("42").await.unwrap());
}

#[tokio::test]
async fn plan_tier_raises_the_ceilings() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let accounts = Arc::new(MemoryAccountRepository::new());
    let mut account = StreamerAccount::new("42", "ana");
    account.plan = PlanTier::Pro;
    accounts.upsert_account(&account).await.unwrap();

    let svc = service(Arc::clone(&usage), accounts);
    let mut counters = seeded(&usage, "42");
    counters.alerts_count = 5;
    usage.seed(counters);

    assert!(svc.can_create_alert("42").await.unwrap());
    assert!(svc.can_upload_file("42", 50 * MIB).await.unwrap());
    assert!(!svc.can_upload_file("42", 50 * MIB + 1).await.unwrap());
}

#[tokio::test]
async fn tts_budget_boundary_is_inclusive() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));

    let mut counters = seeded(&usage, "42");
    counters.tts_chars = 990;
    usage.seed(counters);

    assert!(svc.can_use_tts("42", 10).await.unwrap());
    assert!(!svc.can_use_tts("42", 11).await.unwrap());
}

#[tokio::test]
async fn storage_budget_counts_what_is_already_held() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));

    let mut counters = seeded(&usage, "42");
    counters.storage_bytes = 49 * MIB;
    usage.seed(counters);

    assert!(svc.can_upload_storage("42", MIB).await.unwrap());
    assert!(!svc.can_upload_storage("42", MIB + 1).await.unwrap());
}

#[tokio::test]
async fn counters_reset_when_the_month_rolls_over() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));

    let stale_anchor = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut counters = UsageCounters::fresh("42", stale_anchor);
    counters.alerts_count = 3;
    counters.tts_chars = 900;
    counters.storage_bytes = 10 * MIB;
    counters.bandwidth_bytes = 123;
    usage.seed(counters);

    let current = svc.current_counters("42").await.unwrap();
    assert_eq!(current.month_anchor, month_anchor(Utc::now()));
    assert_eq!(current.alerts_count, 0);
    assert_eq!(current.tts_chars, 0);
    assert_eq!(current.storage_bytes, 0);
    assert_eq!(current.bandwidth_bytes, 0);

    // The reset was written back, not just computed.
    let stored = usage.get_counters("42").await.unwrap().unwrap();
    assert_eq!(stored.month_anchor, month_anchor(Utc::now()));
    assert_eq!(stored.alerts_count, 0);
}

#[tokio::test]
async fn releases_clamp_at_zero() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));
    seeded(&usage, "42");

    svc.decrement_alerts("42").await.unwrap();
    svc.decrement_tts_chars("42", 500).await.unwrap();
    svc.decrement_storage("42", MIB).await.unwrap();

    let counters = svc.current_counters("42").await.unwrap();
    assert_eq!(counters.alerts_count, 0);
    assert_eq!(counters.tts_chars, 0);
    assert_eq!(counters.storage_bytes, 0);
}

#[tokio::test]
async fn bandwidth_accumulates_across_records() {
    let usage = Arc::new(MemoryUsageRepository::new());
    let svc = service(Arc::clone(&usage), Arc::new(MemoryAccountRepository::new()));
    seeded(&usage, "42");

    svc.record_bandwidth("42", 1000).await.unwrap();
    svc.record_bandwidth("42", 500).await.unwrap();

    let counters = svc.current_counters("42").await.unwrap();
    assert_eq!(counters.bandwidth_bytes, 1500);
}
