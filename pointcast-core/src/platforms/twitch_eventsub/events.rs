// File: pointcast-core/src/platforms/twitch_eventsub/events.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;

use pointcast_common::models::RedemptionEvent;

/// The only subscription this pipeline cares about.
pub const REDEMPTION_ADD: &str = "channel.channel_points_custom_reward_redemption.add";

/// Subscription metadata inside a "notification" payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionData {
    pub id: String,
    #[serde(rename = "type")]
    pub sub_type: String,
    pub version: String,
    pub status: String,
}

/// Top-level wrapper of a "notification" payload:
/// `{ "subscription": { ... }, "event": { ... } }`
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEnvelope {
    pub subscription: SubscriptionData,
    pub event: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedeemedReward {
    pub id: String,
    pub title: String,
    pub cost: i64,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPointsRedemptionAdd {
    pub id: String,
    pub broadcaster_user_id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    /// Empty string when the reward takes no viewer input.
    #[serde(default)]
    pub user_input: String,
    pub status: String,
    pub reward: RedeemedReward,
    pub redeemed_at: DateTime<Utc>,
}

/// Converts a redemption-add notification into a `RedemptionEvent`.
/// Any other subscription type (or a malformed event body) yields `None`.
pub fn parse_redemption(sub_type: &str, event: &serde_json::Value) -> Option<RedemptionEvent> {
    if sub_type != REDEMPTION_ADD {
        return None;
    }
    let ev: ChannelPointsRedemptionAdd = serde_json::from_value(event.clone()).ok()?;
    let viewer_message = {
        let trimmed = ev.user_input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };
    Some(RedemptionEvent {
        streamer_id: ev.broadcaster_user_id,
        reward_id: ev.reward.id,
        reward_title: ev.reward.title,
        viewer_username: ev.user_name,
        viewer_message,
        redeemed_at: ev.redeemed_at,
    })
}
