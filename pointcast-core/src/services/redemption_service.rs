// File: pointcast-core/src/services/redemption_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::overlay::hub::OverlayHub;
use crate::overlay::playback::build_utterance;
use crate::overlay::tts::clamp_utterance;
use crate::platforms::RedemptionHandler;
use crate::services::usage_service::UsageService;
use crate::Error;
use pointcast_common::models::{PlaybackCommand, RedemptionEvent, RewardTrigger};
use pointcast_common::traits::repository_traits::TriggerRepository;

/// Resolves incoming redemptions against the trigger store and publishes
/// playback commands to the streamer's overlay room.
pub struct RedemptionService {
    triggers: Arc<dyn TriggerRepository>,
    hub: Arc<OverlayHub>,
    usage: Arc<UsageService>,
    /// Public base the overlay resolves storage keys against.
    media_base_url: String,
}

impl RedemptionService {
    pub fn new(
        triggers: Arc<dyn TriggerRepository>,
        hub: Arc<OverlayHub>,
        usage: Arc<UsageService>,
        media_base_url: String,
    ) -> Self {
        Self {
            triggers,
            hub,
            usage,
            media_base_url: media_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn media_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.media_base_url, storage_key.trim_start_matches('/'))
    }

    /// One command per media entry, in the trigger's configured order.
    /// TTS rides on the first command only so the utterance is spoken
    /// once even when an alert has several media files.
    fn build_commands(&self, trigger: &RewardTrigger, event: &RedemptionEvent) -> Vec<PlaybackCommand> {
        trigger
            .media
            .iter()
            .enumerate()
            .map(|(idx, entry)| PlaybackCommand {
                url: self.media_url(&entry.storage_key),
                kind: entry.kind,
                volume: trigger.volume,
                reward_id: trigger.reward_id.clone(),
                tts_config: if idx == 0 { trigger.tts.clone() } else { None },
                viewer_message: event.viewer_message.clone(),
                viewer_username: Some(event.viewer_username.clone()),
            })
            .collect()
    }

    /// Literal-text TTS is paid for once, when the trigger is created.
    /// Viewer-message TTS varies per redemption, so it is charged here,
    /// on the clamped utterance the overlay will actually synthesize.
    /// An exhausted budget mutes the voice but still plays the alert.
    async fn meter_viewer_tts(
        &self,
        trigger: &mut RewardTrigger,
        event: &RedemptionEvent,
    ) -> Result<(), Error> {
        let Some(cfg) = trigger
            .tts
            .as_ref()
            .filter(|c| c.enabled && c.use_viewer_message)
        else {
            return Ok(());
        };

        let utterance = build_utterance(
            cfg,
            Some(&event.viewer_username),
            event.viewer_message.as_deref(),
        );
        let chars = clamp_utterance(&utterance).chars().count() as i64;

        if self.usage.can_use_tts(&event.streamer_id, chars).await? {
            self.usage
                .increment_tts_chars(&event.streamer_id, chars)
                .await?;
        } else {
            warn!(
                streamer_id = %event.streamer_id,
                reward_id = %event.reward_id,
                chars,
                "monthly TTS budget exhausted; publishing alert without voice"
            );
            trigger.tts = None;
        }
        Ok(())
    }
}

#[async_trait]
impl RedemptionHandler for RedemptionService {
    async fn handle_redemption(&self, event: RedemptionEvent) -> Result<(), Error> {
        let mut trigger = match self
            .triggers
            .get_trigger(&event.streamer_id, &event.reward_id)
            .await?
        {
            Some(t) => t,
            None => {
                // No alert configured for this reward; not an error.
                debug!(
                    streamer_id = %event.streamer_id,
                    reward_id = %event.reward_id,
                    "no trigger for redeemed reward; dropping"
                );
                return Ok(());
            }
        };

        self.meter_viewer_tts(&mut trigger, &event).await?;

        let commands = self.build_commands(&trigger, &event);
        let mut delivered = 0;
        for cmd in commands {
            delivered = self.hub.publish(&event.streamer_id, cmd);
        }
        info!(
            streamer_id = %event.streamer_id,
            reward = %event.reward_title,
            viewer = %event.viewer_username,
            overlays = delivered,
            "alert published"
        );
        Ok(())
    }
}
