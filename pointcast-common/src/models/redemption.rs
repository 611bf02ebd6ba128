// File: pointcast-common/src/models/redemption.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A viewer spending channel points on a reward, as delivered by the
/// platform's event feed and consumed by the redemption listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionEvent {
    /// Broadcaster user id the redemption happened on.
    pub streamer_id: String,
    pub reward_id: String,
    pub reward_title: String,
    pub viewer_username: String,
    /// Text the viewer submitted, when the reward requires input.
    pub viewer_message: Option<String>,
    pub redeemed_at: DateTime<Utc>,
}
