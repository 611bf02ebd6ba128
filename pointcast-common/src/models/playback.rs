// File: pointcast-common/src/models/playback.rs

use serde::{Deserialize, Serialize};

use crate::models::trigger::{MediaKind, TtsConfig};

/// Ephemeral playback instruction published to an overlay room. Never
/// persisted; consumed by whichever overlay clients joined the room.
///
/// This is also the wire payload of the `media-trigger` frame, hence the
/// camelCase field names and the `type` tag for the media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackCommand {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub volume: f32,
    pub reward_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_config: Option<TtsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_username: Option<String>,
}
