// File: pointcast-core/src/overlay/mod.rs

pub mod hub;
pub mod playback;
pub mod tts;
pub mod ws;

pub use hub::OverlayHub;
pub use playback::{
    build_utterance, MediaSink, OverlayPlaybackClient, PlaybackState, SpeechRequest,
    SpeechSynthesizer,
};
pub use tts::ElevenLabsClient;
pub use ws::{overlay_router, OverlayWsState};
