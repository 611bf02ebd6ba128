// File: pointcast-core/src/services/usage_service.rs

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::Error;
use pointcast_common::models::{month_anchor, PlanTier, TierLimits, UsageCounters};
use pointcast_common::traits::repository_traits::{AccountRepository, UsageRepository};

/// Per-streamer monthly accounting: gates creation operations against
/// the plan-tier limits and keeps counters in step with actually-held
/// resources. Counters reset lazily when the billing month rolls over,
/// at the moment of the next read or write.
pub struct UsageService {
    usage_repo: Arc<dyn UsageRepository>,
    accounts_repo: Arc<dyn AccountRepository>,
}

impl UsageService {
    pub fn new(
        usage_repo: Arc<dyn UsageRepository>,
        accounts_repo: Arc<dyn AccountRepository>,
    ) -> Self {
        Self {
            usage_repo,
            accounts_repo,
        }
    }

    /// Current counters with the lazy monthly reset applied.
    pub async fn current_counters(&self, streamer_id: &str) -> Result<UsageCounters, Error> {
        let now = Utc::now();
        match self.usage_repo.get_counters(streamer_id).await? {
            Some(mut counters) => {
                if counters.month_rolled(now) {
                    info!(
                        streamer_id,
                        old_anchor = %counters.month_anchor,
                        "billing month rolled over; resetting usage counters"
                    );
                    counters.reset(month_anchor(now));
                    self.usage_repo.put_counters(&counters).await?;
                }
                Ok(counters)
            }
            None => {
                let counters = UsageCounters::fresh(streamer_id, month_anchor(now));
                self.usage_repo.put_counters(&counters).await?;
                Ok(counters)
            }
        }
    }

    pub async fn limits_for(&self, streamer_id: &str) -> Result<TierLimits, Error> {
        let plan = self
            .accounts_repo
            .get_account(streamer_id)
            .await?
            .map(|a| a.plan)
            .unwrap_or(PlanTier::Free);
        Ok(plan.limits())
    }

    pub async fn can_create_alert(&self, streamer_id: &str) -> Result<bool, Error> {
        let counters = self.current_counters(streamer_id).await?;
        let limits = self.limits_for(streamer_id).await?;
        Ok(counters.alerts_count < limits.max_alerts)
    }

    pub async fn can_use_tts(&self, streamer_id: &str, chars: i64) -> Result<bool, Error> {
        let counters = self.current_counters(streamer_id).await?;
        let limits = self.limits_for(streamer_id).await?;
        Ok(counters.tts_chars + chars <= limits.max_tts_chars)
    }

    /// Single-file ceiling; independent of what is already stored.
    pub async fn can_upload_file(&self, streamer_id: &str, bytes: i64) -> Result<bool, Error> {
        let limits = self.limits_for(streamer_id).await?;
        Ok(bytes <= limits.max_file_bytes)
    }

    /// Whether `bytes` more of storage still fits under the tier's total.
    pub async fn can_upload_storage(&self, streamer_id: &str, bytes: i64) -> Result<bool, Error> {
        let counters = self.current_counters(streamer_id).await?;
        let limits = self.limits_for(streamer_id).await?;
        Ok(counters.storage_bytes + bytes <= limits.max_storage_bytes)
    }

    pub async fn increment_alerts(&self, streamer_id: &str) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.alerts_count += 1).await
    }

    pub async fn decrement_alerts(&self, streamer_id: &str) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.alerts_count = (c.alerts_count - 1).max(0))
            .await
    }

    pub async fn increment_tts_chars(&self, streamer_id: &str, chars: i64) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.tts_chars += chars).await
    }

    /// Releases TTS characters (trigger deleted or text shortened);
    /// clamped so over-release can never drive the counter negative.
    pub async fn decrement_tts_chars(&self, streamer_id: &str, chars: i64) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.tts_chars = (c.tts_chars - chars).max(0))
            .await
    }

    pub async fn increment_storage(&self, streamer_id: &str, bytes: i64) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.storage_bytes += bytes).await
    }

    pub async fn decrement_storage(&self, streamer_id: &str, bytes: i64) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.storage_bytes = (c.storage_bytes - bytes).max(0))
            .await
    }

    pub async fn record_bandwidth(&self, streamer_id: &str, bytes: i64) -> Result<(), Error> {
        self.adjust(streamer_id, |c| c.bandwidth_bytes += bytes).await
    }

    async fn adjust<F>(&self, streamer_id: &str, apply: F) -> Result<(), Error>
    where
        F: FnOnce(&mut UsageCounters),
    {
        let mut counters = self.current_counters(streamer_id).await?;
        apply(&mut counters);
        counters.updated_at = Utc::now();
        debug!(
            streamer_id,
            alerts = counters.alerts_count,
            tts_chars = counters.tts_chars,
            storage = counters.storage_bytes,
            "usage counters updated"
        );
        self.usage_repo.put_counters(&counters).await
    }
}
