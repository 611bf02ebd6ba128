// File: pointcast-core/src/platforms/twitch_eventsub/runtime.rs
//
// One long-lived EventSub websocket per streamer. The session loop
// follows the Twitch protocol: welcome -> subscribe, keepalives,
// server-initiated reconnect hops, and notifications. Connection or
// subscription failures never kill the process; the listener retries
// with exponential backoff and jitter so a streamer's alerts come back
// without a restart.

use std::sync::Arc;

use futures_util::StreamExt;
use rand::Rng;
use reqwest::Client as ReqwestClient;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::platforms::twitch_eventsub::events::{
    parse_redemption, NotificationEnvelope, REDEMPTION_ADD,
};
use crate::platforms::RedemptionHandler;
use crate::services::token_service::TokenService;
use crate::Error;

const EVENTSUB_WS_URL: &str = "wss://eventsub.wss.twitch.tv/ws";
const HELIX_SUBSCRIPTIONS_URL: &str = "https://api.twitch.tv/helix/eventsub/subscriptions";

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 300;
const JITTER_MS: u64 = 1000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outcome of one websocket session.
enum SessionEnd {
    /// Twitch asked us to hop to a new URL.
    Reconnect(String),
    /// Socket closed (gracefully or we were told to shut down).
    Closed,
}

impl SessionEnd {
    /// A reconnect hop carries the old session's subscriptions over, so
    /// the welcome on the new socket must not subscribe again (Twitch
    /// answers a duplicate create with HTTP 409).
    fn keeps_subscriptions(&self) -> bool {
        matches!(self, SessionEnd::Reconnect(_))
    }
}

pub struct EventSubListener {
    streamer_id: String,
    client_id: String,
    tokens: Arc<TokenService>,
    handler: Arc<dyn RedemptionHandler>,
    http: ReqwestClient,
}

impl EventSubListener {
    pub fn new(
        streamer_id: String,
        client_id: String,
        tokens: Arc<TokenService>,
        handler: Arc<dyn RedemptionHandler>,
    ) -> Self {
        Self {
            streamer_id,
            client_id,
            tokens,
            handler,
            http: ReqwestClient::new(),
        }
    }

    /// Runs until shutdown is signalled or the credential becomes
    /// unusable. A missing or revoked credential needs the streamer to
    /// act, so retrying here would be noise.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut url = EVENTSUB_WS_URL.to_string();
        let mut backoff_secs = INITIAL_BACKOFF_SECS;
        let mut subscribe_on_welcome = true;

        loop {
            // A dropped shutdown sender means the manager is gone; stop too.
            if *shutdown_rx.borrow() || shutdown_rx.has_changed().is_err() {
                break;
            }

            // The token service persists any rotation, so this path and
            // the explicit refresher never diverge on the current token.
            let token = match self.tokens.get_valid_access_token(&self.streamer_id).await {
                Ok(t) => t,
                Err(Error::NotFound(msg)) => {
                    warn!(streamer_id = %self.streamer_id, "no stored credential ({msg}); listener exiting");
                    return;
                }
                Err(Error::AuthExpired(msg)) => {
                    error!(
                        streamer_id = %self.streamer_id,
                        "refresh grant rejected ({msg}); streamer must reconnect their account"
                    );
                    return;
                }
                Err(e) => {
                    error!(streamer_id = %self.streamer_id, "token refresh failed: {e}");
                    self.wait_backoff(&mut backoff_secs, &mut shutdown_rx).await;
                    continue;
                }
            };

            let ws = match connect_async(&url).await {
                Ok((ws, _)) => ws,
                Err(e) => {
                    error!(streamer_id = %self.streamer_id, "eventsub connect error: {e}");
                    url = EVENTSUB_WS_URL.to_string();
                    self.wait_backoff(&mut backoff_secs, &mut shutdown_rx).await;
                    continue;
                }
            };
            info!(streamer_id = %self.streamer_id, "eventsub connected -> {url}");

            match self
                .run_session(
                    ws,
                    &token,
                    subscribe_on_welcome,
                    &mut backoff_secs,
                    &mut shutdown_rx,
                )
                .await
            {
                Ok(end) => {
                    subscribe_on_welcome = !end.keeps_subscriptions();
                    match end {
                        SessionEnd::Reconnect(new_url) => {
                            warn!(streamer_id = %self.streamer_id, "eventsub reconnecting -> {new_url}");
                            url = new_url;
                        }
                        SessionEnd::Closed => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                            info!(streamer_id = %self.streamer_id, "eventsub socket closed; will reconnect");
                            url = EVENTSUB_WS_URL.to_string();
                            self.wait_backoff(&mut backoff_secs, &mut shutdown_rx).await;
                        }
                    }
                }
                Err(e) => {
                    error!(streamer_id = %self.streamer_id, "eventsub session error: {e}");
                    subscribe_on_welcome = true;
                    url = EVENTSUB_WS_URL.to_string();
                    self.wait_backoff(&mut backoff_secs, &mut shutdown_rx).await;
                }
            }
        }

        info!(streamer_id = %self.streamer_id, "eventsub listener stopped");
    }

    /// Exponential backoff with jitter, interruptible by shutdown.
    async fn wait_backoff(&self, backoff_secs: &mut u64, shutdown_rx: &mut watch::Receiver<bool>) {
        let jitter_ms = rand::rng().random_range(0..JITTER_MS);
        let wait = Duration::from_secs(*backoff_secs) + Duration::from_millis(jitter_ms);
        debug!(streamer_id = %self.streamer_id, "backing off {wait:?} before reconnect");
        tokio::select! {
            _ = sleep(wait) => {}
            _ = shutdown_rx.changed() => {}
        }
        *backoff_secs = (*backoff_secs * 2).min(MAX_BACKOFF_SECS);
    }

    /// Reads one websocket session until it ends. A successful
    /// subscription resets the caller's backoff.
    async fn run_session(
        &self,
        mut ws: WsStream,
        access_token: &str,
        subscribe: bool,
        backoff_secs: &mut u64,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, Error> {
        loop {
            let msg_res = tokio::select! {
                _ = shutdown_rx.changed() => {
                    let _ = ws.close(None).await;
                    return Ok(SessionEnd::Closed);
                }
                msg = ws.next() => match msg {
                    Some(m) => m,
                    None => return Ok(SessionEnd::Closed),
                },
            };

            let msg = msg_res.map_err(|e| Error::Platform(format!("ws error: {e}")))?;

            if msg.is_close() {
                return Ok(SessionEnd::Closed);
            }
            if msg.is_ping() || msg.is_pong() {
                continue;
            }
            let Message::Text(txt) = msg else { continue };
            let parsed: serde_json::Value = serde_json::from_str(&txt)
                .map_err(|e| Error::Platform(format!("bad json: {e}")))?;

            match parsed
                .get("metadata")
                .and_then(|m| m.get("message_type"))
                .and_then(|v| v.as_str())
            {
                Some("session_welcome") => {
                    let session_id = parsed
                        .pointer("/payload/session/id")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| Error::Platform("welcome without session id".into()))?;
                    if subscribe {
                        self.subscribe_redemptions(session_id, access_token).await?;
                    } else {
                        debug!(
                            streamer_id = %self.streamer_id,
                            "subscriptions carried over from previous session"
                        );
                    }
                    *backoff_secs = INITIAL_BACKOFF_SECS;
                }
                Some("session_keepalive") => trace!("keepalive"),
                Some("session_reconnect") => {
                    let new_url = parsed
                        .pointer("/payload/session/reconnect_url")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| Error::Platform("missing reconnect_url".into()))?
                        .to_string();
                    return Ok(SessionEnd::Reconnect(new_url));
                }
                Some("notification") => {
                    if let Some(payload) = parsed.get("payload") {
                        self.dispatch_notification(payload).await;
                    }
                }
                Some("revocation") => {
                    warn!(streamer_id = %self.streamer_id, "subscription revoked - check scopes");
                }
                other => debug!("unhandled message_type={other:?}"),
            }
        }
    }

    async fn dispatch_notification(&self, payload: &serde_json::Value) {
        let env = match serde_json::from_value::<NotificationEnvelope>(payload.clone()) {
            Ok(env) => env,
            Err(e) => {
                debug!("ignoring malformed notification payload: {e}");
                return;
            }
        };
        let Some(event) = parse_redemption(&env.subscription.sub_type, &env.event) else {
            return;
        };
        debug!(
            streamer_id = %event.streamer_id,
            reward_id = %event.reward_id,
            "redemption received"
        );
        if let Err(e) = self.handler.handle_redemption(event).await {
            // A bad event must not take the session down.
            error!(streamer_id = %self.streamer_id, "redemption handler failed: {e}");
        }
    }

    async fn subscribe_redemptions(
        &self,
        session_id: &str,
        access_token: &str,
    ) -> Result<(), Error> {
        let body = json!({
            "type": REDEMPTION_ADD,
            "version": "1",
            "condition": { "broadcaster_user_id": self.streamer_id },
            "transport": {
                "method": "websocket",
                "session_id": session_id
            }
        });

        let resp = self
            .http
            .post(HELIX_SUBSCRIPTIONS_URL)
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("subscribe request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::CONFLICT {
            debug!(streamer_id = %self.streamer_id, "already subscribed to {REDEMPTION_ADD}");
            return Ok(());
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Platform(format!(
                "could not subscribe to {REDEMPTION_ADD}: HTTP {status}: {text}"
            )));
        }
        debug!(streamer_id = %self.streamer_id, "subscribed to {REDEMPTION_ADD}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionEnd;

    #[test]
    fn only_a_reconnect_hop_keeps_subscriptions() {
        assert!(SessionEnd::Reconnect("wss://example".into()).keeps_subscriptions());
        assert!(!SessionEnd::Closed.keeps_subscriptions());
    }
}
