// File: pointcast-core/src/services/listener_manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::platforms::twitch_eventsub::EventSubListener;
use crate::platforms::RedemptionHandler;
use crate::services::token_service::TokenService;
use crate::Error;
use pointcast_common::traits::repository_traits::CredentialsRepository;

/// Owns the streamer-id -> listener-task registry. Held by the service
/// root rather than living in module-level state, so shutdown and tests
/// get a real object to talk to. Exactly one listener runs per streamer;
/// starting a second is a no-op.
pub struct ListenerManager {
    credentials_repo: Arc<dyn CredentialsRepository>,
    tokens: Arc<TokenService>,
    handler: Arc<dyn RedemptionHandler>,
    client_id: String,
    listeners: DashMap<String, JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ListenerManager {
    pub fn new(
        credentials_repo: Arc<dyn CredentialsRepository>,
        tokens: Arc<TokenService>,
        handler: Arc<dyn RedemptionHandler>,
        client_id: String,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            credentials_repo,
            tokens,
            handler,
            client_id,
            listeners: DashMap::new(),
            shutdown_tx,
        }
    }

    /// Starts the redemption listener for one streamer. Returns `false`
    /// when a listener is already running (idempotent start).
    pub fn start_listener(&self, streamer_id: &str) -> bool {
        if let Some(existing) = self.listeners.get(streamer_id) {
            if !existing.is_finished() {
                return false;
            }
        }

        let listener = EventSubListener::new(
            streamer_id.to_string(),
            self.client_id.clone(),
            Arc::clone(&self.tokens),
            Arc::clone(&self.handler),
        );
        let shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move {
            listener.run(shutdown_rx).await;
        });

        self.listeners.insert(streamer_id.to_string(), task);
        info!(streamer_id, "redemption listener started");
        true
    }

    /// Restores a listener for every stored credential. Called once at
    /// process startup so no credential holder silently stops listening
    /// across a restart.
    pub async fn restore_all(&self) -> Result<usize, Error> {
        let creds = self.credentials_repo.list_credentials().await?;
        let mut started = 0;
        for cred in &creds {
            if self.start_listener(&cred.streamer_id) {
                started += 1;
            }
        }
        info!(
            restored = started,
            known = creds.len(),
            "redemption listeners restored"
        );
        Ok(started)
    }

    pub fn is_running(&self, streamer_id: &str) -> bool {
        self.listeners
            .get(streamer_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.listeners.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn stop_listener(&self, streamer_id: &str) -> bool {
        match self.listeners.remove(streamer_id) {
            Some((_, handle)) => {
                handle.abort();
                info!(streamer_id, "redemption listener stopped");
                true
            }
            None => {
                warn!(streamer_id, "stop requested for unknown listener");
                false
            }
        }
    }

    /// Signals every listener to wind down, then aborts the tasks.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        for entry in self.listeners.iter() {
            entry.value().abort();
        }
        self.listeners.clear();
        info!("listener manager shut down");
    }
}
