// File: pointcast-common/src/models/mod.rs

pub mod account;
pub mod credential;
pub mod playback;
pub mod redemption;
pub mod trigger;
pub mod usage;

pub use account::StreamerAccount;
pub use credential::StreamerCredential;
pub use playback::PlaybackCommand;
pub use redemption::RedemptionEvent;
pub use trigger::{MediaEntry, MediaKind, RewardTrigger, TtsConfig};
pub use usage::{month_anchor, PlanTier, TierLimits, UsageCounters};
