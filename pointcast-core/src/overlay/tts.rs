// File: pointcast-core/src/overlay/tts.rs

use async_trait::async_trait;
use tracing::debug;

use crate::overlay::playback::{SpeechRequest, SpeechSynthesizer};
use crate::Error;

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Utterances longer than this are cut before synthesis. Characters are
/// billed per request, so the cap bounds the worst-case spend of a
/// single redemption.
pub const TTS_CHAR_LIMIT: usize = 300;

/// Trims the utterance to the synthesis character cap.
pub fn clamp_utterance(text: &str) -> String {
    text.chars().take(TTS_CHAR_LIMIT).collect()
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, Error> {
        let text = clamp_utterance(&request.text);
        let url = format!(
            "{ELEVENLABS_API_BASE}/text-to-speech/{}",
            request.voice_id
        );
        let body = serde_json::json!({
            "text": text,
            "voice_settings": {
                "stability": request.stability,
                "similarity_boost": request.similarity_boost,
            },
        });

        let resp = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("elevenlabs request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::AuthExpired(format!(
                "elevenlabs rejected the api key: {status}"
            )));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::Transient(format!(
                "elevenlabs returned {status}: {detail}"
            )));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| Error::Transient(format!("elevenlabs body read failed: {e}")))?;
        debug!(voice_id = %request.voice_id, bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}
