// File: pointcast-common/src/models/trigger.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Closed set of media kinds an alert can play. Matching on this is
/// exhaustive everywhere, so adding a kind forces every use site to be
/// revisited (no silent string fallthrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Gif,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Gif => write!(f, "gif"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "gif" => Ok(MediaKind::Gif),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

/// One uploaded media file attached to a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub kind: MediaKind,
    /// Object-storage locator, resolved to a public URL at publish time.
    pub storage_key: String,
    pub file_name: String,
    pub size_bytes: i64,
}

/// Text-to-speech configuration for a trigger. Either a literal `text`
/// is spoken, or (when `use_viewer_message` is set) the redeemer's
/// submitted message is spoken instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    pub enabled: bool,
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub use_viewer_message: bool,
    #[serde(default)]
    pub read_username: bool,
    pub stability: f32,
    pub similarity_boost: f32,
}

/// Maps one platform reward to the media + TTS behavior it triggers.
/// Unique per (streamer_id, reward_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTrigger {
    pub trigger_id: Uuid,
    pub streamer_id: String,
    pub reward_id: String,
    /// Ordered; playback commands are published in this order.
    pub media: Vec<MediaEntry>,
    pub volume: f32,
    pub tts: Option<TtsConfig>,
    /// Whether the platform reward requires the viewer to submit text.
    /// A TTS config in viewer-message mode is only valid when this is set.
    pub reward_requires_input: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardTrigger {
    /// Enforces the TTS invariants: literal mode needs a non-empty text,
    /// viewer-message mode needs a reward that takes viewer input.
    pub fn validate(&self) -> Result<(), Error> {
        let Some(tts) = &self.tts else { return Ok(()) };
        if !tts.enabled {
            return Ok(());
        }
        if tts.use_viewer_message {
            if !self.reward_requires_input {
                return Err(Error::Parse(
                    "TTS is set to read the viewer message but the reward takes no viewer input"
                        .into(),
                ));
            }
        } else if tts.text.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(Error::Parse(
                "TTS is enabled with a custom text but the text is empty".into(),
            ));
        }
        Ok(())
    }

    /// TTS characters this trigger holds against the monthly budget.
    /// Viewer-message mode holds nothing up front; each redemption is
    /// metered when its alert is published.
    pub fn tts_chars(&self) -> i64 {
        match &self.tts {
            Some(t) if t.enabled && !t.use_viewer_message => {
                t.text.as_deref().map(|s| s.chars().count() as i64).unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Total object-storage bytes held by this trigger's media.
    pub fn storage_bytes(&self) -> i64 {
        self.media.iter().map(|m| m.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_trigger() -> RewardTrigger {
        let now = Utc::now();
        RewardTrigger {
            trigger_id: Uuid::new_v4(),
            streamer_id: "42".into(),
            reward_id: "reward-1".into(),
            media: vec![MediaEntry {
                kind: MediaKind::Video,
                storage_key: "42/alert.mp4".into(),
                file_name: "alert.mp4".into(),
                size_bytes: 1024,
            }],
            volume: 0.8,
            tts: None,
            reward_requires_input: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn media_kind_round_trips_through_strings() {
        for kind in [MediaKind::Video, MediaKind::Audio, MediaKind::Gif] {
            assert_eq!(kind.to_string().parse::<MediaKind>().unwrap(), kind);
        }
        assert!("webm".parse::<MediaKind>().is_err());
    }

    #[test]
    fn literal_tts_requires_non_empty_text() {
        let mut t = base_trigger();
        t.tts = Some(TtsConfig {
            enabled: true,
            voice_id: "v1".into(),
            text: Some("   ".into()),
            use_viewer_message: false,
            read_username: false,
            stability: 0.5,
            similarity_boost: 0.75,
        });
        assert!(t.validate().is_err());

        t.tts.as_mut().unwrap().text = Some("Gracias!".into());
        assert!(t.validate().is_ok());
    }

    #[test]
    fn viewer_message_tts_requires_input_reward() {
        let mut t = base_trigger();
        t.tts = Some(TtsConfig {
            enabled: true,
            voice_id: "v1".into(),
            text: None,
            use_viewer_message: true,
            read_username: true,
            stability: 0.5,
            similarity_boost: 0.75,
        });
        assert!(t.validate().is_err());

        t.reward_requires_input = true;
        assert!(t.validate().is_ok());
    }

    #[test]
    fn disabled_tts_holds_no_characters() {
        let mut t = base_trigger();
        t.tts = Some(TtsConfig {
            enabled: false,
            voice_id: "v1".into(),
            text: Some("Gracias!".into()),
            use_viewer_message: false,
            read_username: false,
            stability: 0.5,
            similarity_boost: 0.75,
        });
        assert_eq!(t.tts_chars(), 0);

        t.tts.as_mut().unwrap().enabled = true;
        assert_eq!(t.tts_chars(), 8);
    }
}
