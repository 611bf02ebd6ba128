// File: pointcast-core/src/services/trigger_service.rs

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::services::usage_service::UsageService;
use crate::Error;
use pointcast_common::models::{MediaEntry, RewardTrigger, TtsConfig};
use pointcast_common::traits::repository_traits::TriggerRepository;

/// Everything needed to configure a new alert.
#[derive(Debug, Clone)]
pub struct NewTrigger {
    pub streamer_id: String,
    pub reward_id: String,
    pub media: Vec<MediaEntry>,
    pub volume: f32,
    pub tts: Option<TtsConfig>,
    pub reward_requires_input: bool,
}

/// Creation, TTS edits and deletion of reward triggers, with the usage
/// gates applied up front and usage released again on deletion.
pub struct TriggerService {
    triggers: Arc<dyn TriggerRepository>,
    usage: Arc<UsageService>,
}

impl TriggerService {
    pub fn new(triggers: Arc<dyn TriggerRepository>, usage: Arc<UsageService>) -> Self {
        Self { triggers, usage }
    }

    pub async fn create_trigger(&self, spec: NewTrigger) -> Result<RewardTrigger, Error> {
        let now = Utc::now();
        let trigger = RewardTrigger {
            trigger_id: Uuid::new_v4(),
            streamer_id: spec.streamer_id,
            reward_id: spec.reward_id,
            media: spec.media,
            volume: spec.volume,
            tts: spec.tts,
            reward_requires_input: spec.reward_requires_input,
            created_at: now,
            updated_at: now,
        };
        trigger.validate()?;

        let streamer_id = trigger.streamer_id.clone();
        let limits = self.usage.limits_for(&streamer_id).await?;

        if !self.usage.can_create_alert(&streamer_id).await? {
            return Err(Error::quota("alerts", limits.max_alerts));
        }

        let tts_chars = trigger.tts_chars();
        if tts_chars > 0 && !self.usage.can_use_tts(&streamer_id, tts_chars).await? {
            return Err(Error::quota("tts_chars", limits.max_tts_chars));
        }

        for entry in &trigger.media {
            if !self
                .usage
                .can_upload_file(&streamer_id, entry.size_bytes)
                .await?
            {
                return Err(Error::quota("file_bytes", limits.max_file_bytes));
            }
        }
        let storage = trigger.storage_bytes();
        if storage > 0 && !self.usage.can_upload_storage(&streamer_id, storage).await? {
            return Err(Error::quota("storage_bytes", limits.max_storage_bytes));
        }

        self.triggers.upsert_trigger(&trigger).await?;
        self.usage.increment_alerts(&streamer_id).await?;
        if tts_chars > 0 {
            self.usage
                .increment_tts_chars(&streamer_id, tts_chars)
                .await?;
        }
        if storage > 0 {
            self.usage.increment_storage(&streamer_id, storage).await?;
        }

        info!(
            streamer_id,
            reward_id = %trigger.reward_id,
            media = trigger.media.len(),
            "trigger created"
        );
        Ok(trigger)
    }

    /// Replaces the TTS configuration, re-gating and re-metering the
    /// character budget by the delta between old and new text.
    pub async fn update_tts_config(
        &self,
        streamer_id: &str,
        reward_id: &str,
        tts: Option<TtsConfig>,
    ) -> Result<RewardTrigger, Error> {
        let mut trigger = self
            .triggers
            .get_trigger(streamer_id, reward_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("no trigger for reward {reward_id}"))
            })?;

        let old_chars = trigger.tts_chars();
        trigger.tts = tts;
        trigger.updated_at = Utc::now();
        trigger.validate()?;

        let new_chars = trigger.tts_chars();
        if new_chars > old_chars {
            let delta = new_chars - old_chars;
            if !self.usage.can_use_tts(streamer_id, delta).await? {
                let limits = self.usage.limits_for(streamer_id).await?;
                return Err(Error::quota("tts_chars", limits.max_tts_chars));
            }
        }

        self.triggers.upsert_trigger(&trigger).await?;
        if new_chars > old_chars {
            self.usage
                .increment_tts_chars(streamer_id, new_chars - old_chars)
                .await?;
        } else if old_chars > new_chars {
            self.usage
                .decrement_tts_chars(streamer_id, old_chars - new_chars)
                .await?;
        }
        Ok(trigger)
    }

    /// Removes the alert and releases the usage it was holding: the
    /// alert slot, its literal TTS characters and its storage bytes.
    pub async fn delete_trigger(&self, streamer_id: &str, reward_id: &str) -> Result<bool, Error> {
        let Some(trigger) = self.triggers.delete_trigger(streamer_id, reward_id).await? else {
            return Ok(false);
        };

        self.usage.decrement_alerts(streamer_id).await?;
        let tts_chars = trigger.tts_chars();
        if tts_chars > 0 {
            self.usage
                .decrement_tts_chars(streamer_id, tts_chars)
                .await?;
        }
        let storage = trigger.storage_bytes();
        if storage > 0 {
            self.usage.decrement_storage(streamer_id, storage).await?;
        }

        info!(streamer_id, reward_id, "trigger deleted; usage released");
        Ok(true)
    }

    pub async fn list_triggers(&self, streamer_id: &str) -> Result<Vec<RewardTrigger>, Error> {
        self.triggers.list_triggers(streamer_id).await
    }
}
