// File: pointcast-core/src/overlay/ws.rs
//
// WebSocket bridge between the hub and browser overlay sources. A
// client joins with a `join-overlay` message and from then on receives
// `media-trigger` frames for its streamer's room.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::overlay::hub::OverlayHub;
use pointcast_common::models::PlaybackCommand;

#[derive(Clone)]
pub struct OverlayWsState {
    pub hub: Arc<OverlayHub>,
}

/// First frame a client must send after connecting.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinOverlay {
    event: String,
    streamer_id: String,
    #[serde(default)]
    reward_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MediaTriggerFrame<'a> {
    event: &'static str,
    payload: &'a PlaybackCommand,
}

pub fn overlay_router(hub: Arc<OverlayHub>) -> Router {
    Router::new()
        .route("/overlay/ws", get(ws_handler))
        .with_state(OverlayWsState { hub })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<OverlayWsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: OverlayWsState) {
    let (mut sender, mut receiver) = socket.split();

    // The join message decides which room this socket belongs to.
    let join = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<JoinOverlay>(&text) {
                Ok(join) if join.event == "join-overlay" => break join,
                Ok(other) => {
                    warn!(event = %other.event, "expected join-overlay as first message");
                    return;
                }
                Err(e) => {
                    warn!("malformed join message: {e}");
                    return;
                }
            },
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!("socket error before join: {e}");
                return;
            }
        }
    };

    let streamer_id = join.streamer_id;
    let mut commands = state.hub.join(&streamer_id);
    info!(
        streamer_id,
        reward_id = ?join.reward_id,
        "overlay client joined"
    );

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                if let Some(filter) = &join.reward_id {
                    if &cmd.reward_id != filter {
                        continue;
                    }
                }
                let frame = MediaTriggerFrame {
                    event: "media-trigger",
                    payload: &cmd,
                };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(streamer_id, "failed to encode media-trigger: {e}");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(streamer_id, "overlay socket error: {e}");
                        break;
                    }
                }
            }
        }
    }

    info!(streamer_id, "overlay client disconnected");
}
