// File: pointcast-common/src/traits/repository_traits.rs

use async_trait::async_trait;

use crate::error::Error;
use crate::models::account::StreamerAccount;
use crate::models::credential::StreamerCredential;
use crate::models::trigger::RewardTrigger;
use crate::models::usage::UsageCounters;

/// Persists per-streamer OAuth tokens. `store_credential` is a
/// full-record upsert keyed by streamer id: both the explicit token
/// refresher and the listener's own rotation path write through it, and
/// the last writer wins (refreshes are idempotent in effect).
#[async_trait]
pub trait CredentialsRepository: Send + Sync {
    async fn store_credential(&self, cred: &StreamerCredential) -> Result<(), Error>;
    async fn get_credential(&self, streamer_id: &str) -> Result<Option<StreamerCredential>, Error>;
    async fn list_credentials(&self) -> Result<Vec<StreamerCredential>, Error>;
}

#[async_trait]
pub trait TriggerRepository: Send + Sync {
    async fn upsert_trigger(&self, trigger: &RewardTrigger) -> Result<(), Error>;
    async fn get_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error>;
    async fn list_triggers(&self, streamer_id: &str) -> Result<Vec<RewardTrigger>, Error>;
    /// Returns the removed trigger so callers can release the usage it
    /// was holding.
    async fn delete_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error>;
}

/// Whole-record reads and upserts; the usage service owns the counter
/// arithmetic and the lazy monthly reset.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn get_counters(&self, streamer_id: &str) -> Result<Option<UsageCounters>, Error>;
    async fn put_counters(&self, counters: &UsageCounters) -> Result<(), Error>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn upsert_account(&self, account: &StreamerAccount) -> Result<(), Error>;
    async fn get_account(&self, streamer_id: &str) -> Result<Option<StreamerAccount>, Error>;
}
