// File: pointcast-core/tests/trigger_service_tests.rs

use std::sync::Arc;

use pointcast_common::error::Error;
use pointcast_common::models::{MediaKind, TtsConfig};
use pointcast_common::traits::repository_traits::TriggerRepository;
use pointcast_core::services::{NewTrigger, TriggerService, UsageService};
use pointcast_core::test_utils::{
    sample_media, MemoryAccountRepository, MemoryTriggerRepository, MemoryUsageRepository,
};

const MIB: i64 = 1024 * 1024;

struct Fixture {
    triggers: Arc<MemoryTriggerRepository>,
    usage: Arc<UsageService>,
    svc: TriggerService,
}

fn fixture() -> Fixture {
    let triggers = Arc::new(MemoryTriggerRepository::new());
    let usage = Arc::new(UsageService::new(
        Arc::new(MemoryUsageRepository::new()),
        Arc::new(MemoryAccountRepository::new()),
    ));
    let svc = TriggerService::new(
        Arc::clone(&triggers) as Arc<dyn TriggerRepository>,
        Arc::clone(&usage),
    );
    Fixture {
        triggers,
        usage,
        svc,
    }
}

fn literal_tts(text: &str) -> TtsConfig {
    TtsConfig {
        enabled: true,
        voice_id: "voice-1".to_string(),
        text: Some(text.to_string()),
        use_viewer_message: false,
        read_username: false,
        stability: 0.5,
        similarity_boost: 0.75,
    }
}

fn new_trigger(reward_id: &str) -> NewTrigger {
    NewTrigger {
        streamer_id: "42".to_string(),
        reward_id: reward_id.to_string(),
        media: vec![sample_media(MediaKind::Video, 2 * MIB)],
        volume: 0.8,
        tts: None,
        reward_requires_input: false,
    }
}

#[tokio::test]
async fn creating_a_trigger_meters_every_counter() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.tts = Some(literal_tts("Gracias por el apoyo"));

    let trigger = f.svc.create_trigger(spec).await.unwrap();
    assert_eq!(trigger.reward_id, "reward-1");

    let counters = f.usage.current_counters("42").await.unwrap();
    assert_eq!(counters.alerts_count, 1);
    assert_eq!(counters.tts_chars, "Gracias por el apoyo".chars().count() as i64);
    assert_eq!(counters.storage_bytes, 2 * MIB);
}

#[tokio::test]
async fn alert_quota_rejects_the_fourth_free_tier_trigger() {
    let f = fixture();
    for i in 0..3 {
        f.svc.create_trigger(new_trigger(&format!("r{i}"))).await.unwrap();
    }

    let err = f.svc.create_trigger(new_trigger("r3")).await.unwrap_err();
    match err {
        Error::QuotaExceeded { resource, limit } => {
            assert_eq!(resource, "alerts");
            assert_eq!(limit, 3);
        }
        other => panic!("expected alert quota error, got {other}"),
    }
    assert_eq!(f.triggers.list_triggers("42").await.unwrap().len(), 3);
}

#[tokio::test]
async fn tts_character_quota_gates_creation() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.tts = Some(literal_tts(&"a".repeat(1001)));

    let err = f.svc.create_trigger(spec).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { resource, .. } if resource == "tts_chars"));
}

#[tokio::test]
async fn oversize_file_is_rejected_before_anything_is_metered() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.media = vec![sample_media(MediaKind::Video, 10 * MIB + 1)];

    let err = f.svc.create_trigger(spec).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { resource, .. } if resource == "file_bytes"));

    let counters = f.usage.current_counters("42").await.unwrap();
    assert_eq!(counters.alerts_count, 0);
    assert_eq!(counters.storage_bytes, 0);
}

#[tokio::test]
async fn invalid_tts_config_never_reaches_the_store() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.tts = Some(literal_tts("   "));

    assert!(f.svc.create_trigger(spec).await.is_err());
    assert!(f.triggers.list_triggers("42").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_trigger_releases_exactly_what_it_held() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.tts = Some(literal_tts("Hola"));
    f.svc.create_trigger(spec).await.unwrap();
    f.svc.create_trigger(new_trigger("reward-2")).await.unwrap();

    assert!(f.svc.delete_trigger("42", "reward-1").await.unwrap());

    let counters = f.usage.current_counters("42").await.unwrap();
    assert_eq!(counters.alerts_count, 1);
    assert_eq!(counters.tts_chars, 0);
    assert_eq!(counters.storage_bytes, 2 * MIB);

    // Deleting again is a clean no-op.
    assert!(!f.svc.delete_trigger("42", "reward-1").await.unwrap());
}

#[tokio::test]
async fn updating_tts_re_meters_by_the_delta() {
    let f = fixture();
    let mut spec = new_trigger("reward-1");
    spec.tts = Some(literal_tts("Hola"));
    f.svc.create_trigger(spec).await.unwrap();

    f.svc
        .update_tts_config("42", "reward-1", Some(literal_tts("Hola a todos")))
        .await
        .unwrap();
    let counters = f.usage.current_counters("42").await.unwrap();
    assert_eq!(counters.tts_chars, "Hola a todos".chars().count() as i64);

    f.svc
        .update_tts_config("42", "reward-1", None)
        .await
        .unwrap();
    let counters = f.usage.current_counters("42").await.unwrap();
    assert_eq!(counters.tts_chars, 0);
}

#[tokio::test]
async fn updating_tts_on_a_missing_trigger_is_not_found() {
    let f = fixture();
    let err = f
        .svc
        .update_tts_config("42", "ghost", Some(literal_tts("Hola")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
