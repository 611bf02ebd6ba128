// File: pointcast-core/src/overlay/playback.rs
//
// The overlay playback state machine. A single consumer serializes the
// playback commands arriving from the hub: optional speech synthesis
// first, then the visual/audio media, strictly one command at a time in
// arrival order. A failed synthesis or a failed playback always releases
// the machine back to Idle so one bad item can never starve the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::Error;
use pointcast_common::models::{MediaKind, PlaybackCommand, TtsConfig};

/// GIFs have no natural end signal; a fixed timer stands in for one.
pub const GIF_PLAYBACK: Duration = Duration::from_secs(5);

/// Commands queued beyond this depth are dropped (newest first) with a
/// warning. Redemptions arriving faster than alerts can play for this
/// long means the overlay is hopelessly behind anyway.
pub const MAX_QUEUE_DEPTH: usize = 64;

/// Spoken when a TTS-enabled alert ends up with no usable text.
pub const DEFAULT_TTS_TEXT: &str = "Gracias por apoyar el stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    SynthesizingSpeech,
    PlayingMedia,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, Error>;
}

/// Where the overlay actually renders. `play_media` and `play_audio`
/// resolve when playback reaches its natural end; `show_image` only
/// starts the render, since a looping image never ends on its own.
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn play_audio(&self, audio: Vec<u8>, volume: f32) -> Result<(), Error>;
    async fn play_media(&self, kind: MediaKind, url: &str, volume: f32) -> Result<(), Error>;
    async fn show_image(&self, url: &str) -> Result<(), Error>;
}

/// Builds the utterance for a TTS-enabled command.
///
/// Viewer-message mode: `"{name} dice: {message}"`, the name prefix only
/// when read-username is set. Literal mode: the configured text as-is.
/// Either way an empty text falls back to the default phrase.
pub fn build_utterance(
    cfg: &TtsConfig,
    viewer_username: Option<&str>,
    viewer_message: Option<&str>,
) -> String {
    if cfg.use_viewer_message {
        let message = viewer_message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_TTS_TEXT);
        match viewer_username.filter(|_| cfg.read_username) {
            Some(name) => format!("{name} dice: {message}"),
            None => message.to_string(),
        }
    } else {
        match cfg.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => text.to_string(),
            None => DEFAULT_TTS_TEXT.to_string(),
        }
    }
}

pub struct OverlayPlaybackClient {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn MediaSink>,
    /// When the overlay instance is scoped to a single reward, commands
    /// for any other reward are discarded on arrival.
    reward_filter: Option<String>,
    state_tx: watch::Sender<PlaybackState>,
    skip: Arc<Notify>,
}

impl OverlayPlaybackClient {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn MediaSink>,
        reward_filter: Option<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        Self {
            synthesizer,
            sink,
            reward_filter,
            state_tx,
            skip: Arc::new(Notify::new()),
        }
    }

    /// Observable state, mainly for tests and diagnostics.
    pub fn state(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    /// Handle for the operator-triggered skip: aborts whatever is
    /// currently synthesizing or playing and moves on to the next item.
    pub fn skip_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.skip)
    }

    /// Consumes commands until the channel closes and the queue drains.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<PlaybackCommand>) {
        let mut queue: VecDeque<PlaybackCommand> = VecDeque::new();

        loop {
            if queue.is_empty() {
                // Idle: wait for the next arrival.
                match rx.recv().await {
                    Some(cmd) => {
                        self.enqueue(&mut queue, cmd);
                        continue;
                    }
                    None => break,
                }
            }

            let Some(cmd) = queue.pop_front() else { continue };
            self.play_one(cmd, &mut rx, &mut queue).await;
            self.state_tx.send_replace(PlaybackState::Idle);
        }

        self.state_tx.send_replace(PlaybackState::Idle);
        debug!("playback client finished");
    }

    fn enqueue(&self, queue: &mut VecDeque<PlaybackCommand>, cmd: PlaybackCommand) {
        if let Some(filter) = &self.reward_filter {
            if &cmd.reward_id != filter {
                debug!(reward_id = %cmd.reward_id, "command outside reward scope; discarded");
                return;
            }
        }
        if queue.len() >= MAX_QUEUE_DEPTH {
            warn!(
                reward_id = %cmd.reward_id,
                depth = queue.len(),
                "playback queue full; dropping newest command"
            );
            return;
        }
        queue.push_back(cmd);
    }

    /// Plays one command to completion while still accepting arrivals
    /// into the queue. Ends early on skip; errors are logged and the
    /// machine is released either way.
    async fn play_one(
        &self,
        cmd: PlaybackCommand,
        rx: &mut mpsc::UnboundedReceiver<PlaybackCommand>,
        queue: &mut VecDeque<PlaybackCommand>,
    ) {
        // A skip pressed while idle targets nothing; drop the stale
        // permit so it cannot cancel this alert the moment it starts.
        let _ = self.skip.notified().now_or_never();

        let playback = self.drive(&cmd);
        tokio::pin!(playback);
        let mut rx_open = true;

        loop {
            tokio::select! {
                result = &mut playback => {
                    if let Err(e) = result {
                        warn!(reward_id = %cmd.reward_id, "playback failed: {e}");
                    }
                    return;
                }
                _ = self.skip.notified() => {
                    info!(reward_id = %cmd.reward_id, "current alert skipped");
                    return;
                }
                arrival = rx.recv(), if rx_open => match arrival {
                    Some(next) => self.enqueue(queue, next),
                    None => rx_open = false,
                },
            }
        }
    }

    async fn drive(&self, cmd: &PlaybackCommand) -> Result<(), Error> {
        if let Some(cfg) = cmd.tts_config.as_ref().filter(|c| c.enabled) {
            self.state_tx.send_replace(PlaybackState::SynthesizingSpeech);
            let request = SpeechRequest {
                text: build_utterance(
                    cfg,
                    cmd.viewer_username.as_deref(),
                    cmd.viewer_message.as_deref(),
                ),
                voice_id: cfg.voice_id.clone(),
                stability: cfg.stability,
                similarity_boost: cfg.similarity_boost,
            };
            match self.synthesizer.synthesize(&request).await {
                Ok(audio) => {
                    if let Err(e) = self.sink.play_audio(audio, cmd.volume).await {
                        warn!(reward_id = %cmd.reward_id, "voice playback failed: {e}");
                    }
                }
                // A broken voice never blocks the visual alert.
                Err(e) => warn!(
                    reward_id = %cmd.reward_id,
                    "speech synthesis failed, playing media without voice: {e}"
                ),
            }
        }

        self.state_tx.send_replace(PlaybackState::PlayingMedia);
        match cmd.kind {
            MediaKind::Video | MediaKind::Audio => {
                self.sink.play_media(cmd.kind, &cmd.url, cmd.volume).await?;
            }
            MediaKind::Gif => {
                self.sink.show_image(&cmd.url).await?;
                sleep(GIF_PLAYBACK).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tts(use_viewer_message: bool, read_username: bool, text: Option<&str>) -> TtsConfig {
        TtsConfig {
            enabled: true,
            voice_id: "v1".into(),
            text: text.map(String::from),
            use_viewer_message,
            read_username,
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }

    #[test]
    fn viewer_message_with_username_prefix() {
        let cfg = tts(true, true, None);
        assert_eq!(build_utterance(&cfg, Some("Ana"), Some("hola")), "Ana dice: hola");
    }

    #[test]
    fn viewer_message_without_username() {
        let cfg = tts(true, false, None);
        assert_eq!(build_utterance(&cfg, Some("Ana"), Some("hola")), "hola");
    }

    #[test]
    fn literal_text_ignores_viewer_message() {
        let cfg = tts(false, true, Some("Gracias!"));
        assert_eq!(
            build_utterance(&cfg, Some("Ana"), Some("hola")),
            "Gracias!"
        );
    }

    #[test]
    fn empty_viewer_message_falls_back_to_default() {
        let cfg = tts(true, true, None);
        assert_eq!(
            build_utterance(&cfg, Some("Ana"), Some("   ")),
            format!("Ana dice: {DEFAULT_TTS_TEXT}")
        );
        assert_eq!(build_utterance(&cfg, Some("Ana"), None), format!("Ana dice: {DEFAULT_TTS_TEXT}"));
    }

    #[test]
    fn empty_literal_text_falls_back_to_default() {
        let cfg = tts(false, false, Some(""));
        assert_eq!(build_utterance(&cfg, None, None), DEFAULT_TTS_TEXT);
    }
}
