// File: pointcast-core/src/test_utils/mod.rs
//
// In-memory fakes shared by the crate's tests. Nothing here touches a
// database or the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use uuid::Uuid;

use crate::overlay::playback::{MediaSink, SpeechRequest, SpeechSynthesizer};
use crate::platforms::twitch::{OAuthClient, TokenGrant, ValidatedToken};
use crate::Error;
use pointcast_common::models::{
    MediaEntry, MediaKind, PlaybackCommand, RewardTrigger, StreamerAccount, StreamerCredential,
    TtsConfig, UsageCounters,
};
use pointcast_common::traits::repository_traits::{
    AccountRepository, CredentialsRepository, TriggerRepository, UsageRepository,
};

pub fn sample_credential(streamer_id: &str, expires_in: i64) -> StreamerCredential {
    let now = Utc::now();
    StreamerCredential {
        streamer_id: streamer_id.to_string(),
        access_token: "access-0".to_string(),
        refresh_token: "refresh-0".to_string(),
        expires_in,
        issued_at: now,
        scopes: vec!["channel:read:redemptions".to_string()],
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_grant(access: &str, refresh: &str, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in,
        scope: vec!["channel:read:redemptions".to_string()],
    }
}

pub fn sample_media(kind: MediaKind, size_bytes: i64) -> MediaEntry {
    MediaEntry {
        kind,
        storage_key: format!("media/{}", Uuid::new_v4()),
        file_name: "alert.webm".to_string(),
        size_bytes,
    }
}

pub fn sample_trigger(streamer_id: &str, reward_id: &str) -> RewardTrigger {
    let now = Utc::now();
    RewardTrigger {
        trigger_id: Uuid::new_v4(),
        streamer_id: streamer_id.to_string(),
        reward_id: reward_id.to_string(),
        media: vec![sample_media(MediaKind::Video, 1024)],
        volume: 0.8,
        tts: None,
        reward_requires_input: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_command(reward_id: &str, kind: MediaKind) -> PlaybackCommand {
    PlaybackCommand {
        kind,
        url: format!("https://media.example.com/{reward_id}.webm"),
        volume: 0.8,
        reward_id: reward_id.to_string(),
        tts_config: None,
        viewer_message: None,
        viewer_username: None,
    }
}

pub fn viewer_tts() -> TtsConfig {
    TtsConfig {
        enabled: true,
        voice_id: "voice-1".to_string(),
        text: None,
        use_viewer_message: true,
        read_username: true,
        stability: 0.5,
        similarity_boost: 0.75,
    }
}

// ---------------------------------------------------------------------
// Repositories

#[derive(Default)]
pub struct MemoryCredentialsRepository {
    creds: Mutex<HashMap<String, StreamerCredential>>,
}

impl MemoryCredentialsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialsRepository for MemoryCredentialsRepository {
    async fn store_credential(&self, cred: &StreamerCredential) -> Result<(), Error> {
        self.creds
            .lock()
            .unwrap()
            .insert(cred.streamer_id.clone(), cred.clone());
        Ok(())
    }

    async fn get_credential(&self, streamer_id: &str) -> Result<Option<StreamerCredential>, Error> {
        Ok(self.creds.lock().unwrap().get(streamer_id).cloned())
    }

    async fn list_credentials(&self) -> Result<Vec<StreamerCredential>, Error> {
        Ok(self.creds.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryTriggerRepository {
    triggers: Mutex<HashMap<(String, String), RewardTrigger>>,
}

impl MemoryTriggerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TriggerRepository for MemoryTriggerRepository {
    async fn upsert_trigger(&self, trigger: &RewardTrigger) -> Result<(), Error> {
        self.triggers.lock().unwrap().insert(
            (trigger.streamer_id.clone(), trigger.reward_id.clone()),
            trigger.clone(),
        );
        Ok(())
    }

    async fn get_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error> {
        Ok(self
            .triggers
            .lock()
            .unwrap()
            .get(&(streamer_id.to_string(), reward_id.to_string()))
            .cloned())
    }

    async fn list_triggers(&self, streamer_id: &str) -> Result<Vec<RewardTrigger>, Error> {
        Ok(self
            .triggers
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.streamer_id == streamer_id)
            .cloned()
            .collect())
    }

    async fn delete_trigger(
        &self,
        streamer_id: &str,
        reward_id: &str,
    ) -> Result<Option<RewardTrigger>, Error> {
        Ok(self
            .triggers
            .lock()
            .unwrap()
            .remove(&(streamer_id.to_string(), reward_id.to_string())))
    }
}

#[derive(Default)]
pub struct MemoryUsageRepository {
    counters: Mutex<HashMap<String, UsageCounters>>,
}

impl MemoryUsageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, counters: UsageCounters) {
        self.counters
            .lock()
            .unwrap()
            .insert(counters.streamer_id.clone(), counters);
    }
}

#[async_trait]
impl UsageRepository for MemoryUsageRepository {
    async fn get_counters(&self, streamer_id: &str) -> Result<Option<UsageCounters>, Error> {
        Ok(self.counters.lock().unwrap().get(streamer_id).cloned())
    }

    async fn put_counters(&self, counters: &UsageCounters) -> Result<(), Error> {
        self.counters
            .lock()
            .unwrap()
            .insert(counters.streamer_id.clone(), counters.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: Mutex<HashMap<String, StreamerAccount>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn upsert_account(&self, account: &StreamerAccount) -> Result<(), Error> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.streamer_id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, streamer_id: &str) -> Result<Option<StreamerAccount>, Error> {
        Ok(self.accounts.lock().unwrap().get(streamer_id).cloned())
    }
}

// ---------------------------------------------------------------------
// OAuth

/// Scripted OAuth endpoint. `refresh` hands out `grant-{n}` tokens and
/// counts its calls; flip `fail_refresh` to make it report a dead
/// refresh token.
pub struct FakeOAuthClient {
    pub refresh_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    next_grant: Mutex<TokenGrant>,
    validated: Mutex<ValidatedToken>,
}

impl FakeOAuthClient {
    pub fn new(streamer_id: &str, login: &str) -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            next_grant: Mutex::new(sample_grant("access-1", "refresh-1", 3600)),
            validated: Mutex::new(ValidatedToken {
                user_id: streamer_id.to_string(),
                login: login.to_string(),
                scopes: vec!["channel:read:redemptions".to_string()],
            }),
        }
    }

    pub fn set_next_grant(&self, grant: TokenGrant) {
        *self.next_grant.lock().unwrap() = grant;
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClient for FakeOAuthClient {
    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenGrant, Error> {
        Ok(self.next_grant.lock().unwrap().clone())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(Error::AuthExpired("refresh token revoked".to_string()));
        }
        Ok(self.next_grant.lock().unwrap().clone())
    }

    async fn validate(&self, _access_token: &str) -> Result<ValidatedToken, Error> {
        Ok(self.validated.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------
// Overlay

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Audio { bytes: usize, volume: f32 },
    Media { kind: MediaKind, url: String, volume: f32 },
    Image { url: String },
}

/// Records what the playback client asked it to render. When built with
/// `gated()`, `play_media` blocks until the test releases a permit, so
/// ordering and no-overlap can be observed.
pub struct RecordingMediaSink {
    events: Mutex<Vec<(SinkEvent, Instant)>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingMediaSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let sink = Self {
            events: Mutex::new(Vec::new()),
            gate: Some(Arc::clone(&gate)),
        };
        (sink, gate)
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    pub fn timed_events(&self) -> Vec<(SinkEvent, Instant)> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().unwrap().push((event, Instant::now()));
    }
}

impl Default for RecordingMediaSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSink for RecordingMediaSink {
    async fn play_audio(&self, audio: Vec<u8>, volume: f32) -> Result<(), Error> {
        self.record(SinkEvent::Audio {
            bytes: audio.len(),
            volume,
        });
        Ok(())
    }

    async fn play_media(&self, kind: MediaKind, url: &str, volume: f32) -> Result<(), Error> {
        self.record(SinkEvent::Media {
            kind,
            url: url.to_string(),
            volume,
        });
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate never closed").forget();
        }
        Ok(())
    }

    async fn show_image(&self, url: &str) -> Result<(), Error> {
        self.record(SinkEvent::Image {
            url: url.to_string(),
        });
        Ok(())
    }
}

/// Returns a fixed audio clip, or a transient failure when `fail` is
/// set. Remembers the last request it saw.
pub struct FakeSynthesizer {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    last_request: Mutex<Option<SpeechRequest>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        let fake = Self::new();
        fake.fail.store(true, Ordering::SeqCst);
        fake
    }

    pub fn last_request(&self) -> Option<SpeechRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transient("synthesis backend down".to_string()));
        }
        Ok(vec![0u8; 64])
    }
}
