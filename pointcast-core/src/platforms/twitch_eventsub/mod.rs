// File: pointcast-core/src/platforms/twitch_eventsub/mod.rs

pub mod events;
pub mod runtime;

pub use runtime::EventSubListener;
