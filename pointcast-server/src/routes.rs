// File: pointcast-server/src/routes.rs
//
// HTTP surface: the Twitch OAuth login/callback pair and the trigger
// management API the dashboard talks to.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use pointcast_common::error::Error;
use pointcast_common::models::{MediaEntry, RewardTrigger, TtsConfig};
use pointcast_core::platforms::twitch::TwitchOAuthClient;
use pointcast_core::services::{AuthService, NewTrigger, TriggerService, UsageService};

#[derive(Clone)]
pub struct AppContext {
    pub oauth: Arc<TwitchOAuthClient>,
    pub auth: Arc<AuthService>,
    pub triggers: Arc<TriggerService>,
    pub usage: Arc<UsageService>,
    pub redirect_uri: String,
}

pub fn api_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/auth/twitch/login", get(twitch_login))
        .route("/auth/twitch/callback", get(twitch_callback))
        .route(
            "/api/streamers/{streamer_id}/triggers",
            post(create_trigger).get(list_triggers),
        )
        .route(
            "/api/streamers/{streamer_id}/triggers/{reward_id}/tts",
            put(update_tts),
        )
        .route(
            "/api/streamers/{streamer_id}/triggers/{reward_id}",
            delete(remove_trigger),
        )
        .route("/api/streamers/{streamer_id}/usage", get(get_usage))
        .with_state(ctx)
}

/// Domain errors mapped onto HTTP statuses for the API handlers.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Parse(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::AuthExpired(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Error::QuotaExceeded { resource, limit } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{resource} quota exceeded (limit {limit})"),
            ),
            other => {
                error!("request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// --------------------------------------------------------------------
// OAuth

async fn twitch_login(State(ctx): State<AppContext>) -> Redirect {
    let state = Uuid::new_v4().to_string();
    let url = ctx.oauth.authorize_url(&ctx.redirect_uri, &state);
    Redirect::temporary(&url)
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    #[allow(dead_code)]
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn twitch_callback(
    State(ctx): State<AppContext>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<String>, ApiError> {
    if let Some(err) = query.error {
        let description = query.error_description.unwrap_or_default();
        warn!(error = %err, %description, "twitch login denied");
        return Ok(Html(format!(
            "<h1>Login failed</h1><p>{err}: {description}</p>"
        )));
    }

    let code = query
        .code
        .ok_or_else(|| Error::Parse("callback carried neither code nor error".into()))?;
    let account = ctx.auth.complete_login(&code, &ctx.redirect_uri).await?;
    info!(streamer_id = %account.streamer_id, "streamer connected");
    Ok(Html(format!(
        "<h1>Connected!</h1><p>Alerts are now active for {}. You can close this tab.</p>",
        account.display_name
    )))
}

// --------------------------------------------------------------------
// Triggers

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTriggerRequest {
    reward_id: String,
    media: Vec<MediaEntry>,
    volume: f32,
    #[serde(default)]
    tts: Option<TtsConfig>,
    #[serde(default)]
    reward_requires_input: bool,
}

async fn create_trigger(
    State(ctx): State<AppContext>,
    Path(streamer_id): Path<String>,
    Json(req): Json<CreateTriggerRequest>,
) -> Result<(StatusCode, Json<RewardTrigger>), ApiError> {
    let trigger = ctx
        .triggers
        .create_trigger(NewTrigger {
            streamer_id,
            reward_id: req.reward_id,
            media: req.media,
            volume: req.volume,
            tts: req.tts,
            reward_requires_input: req.reward_requires_input,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(trigger)))
}

async fn list_triggers(
    State(ctx): State<AppContext>,
    Path(streamer_id): Path<String>,
) -> Result<Json<Vec<RewardTrigger>>, ApiError> {
    Ok(Json(ctx.triggers.list_triggers(&streamer_id).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateTtsRequest {
    #[serde(default)]
    tts: Option<TtsConfig>,
}

async fn update_tts(
    State(ctx): State<AppContext>,
    Path((streamer_id, reward_id)): Path<(String, String)>,
    Json(req): Json<UpdateTtsRequest>,
) -> Result<Json<RewardTrigger>, ApiError> {
    let trigger = ctx
        .triggers
        .update_tts_config(&streamer_id, &reward_id, req.tts)
        .await?;
    Ok(Json(trigger))
}

async fn remove_trigger(
    State(ctx): State<AppContext>,
    Path((streamer_id, reward_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    if ctx.triggers.delete_trigger(&streamer_id, &reward_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("no trigger for reward {reward_id}")).into())
    }
}

// --------------------------------------------------------------------
// Usage

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageResponse {
    alerts_count: i64,
    max_alerts: i64,
    tts_chars: i64,
    max_tts_chars: i64,
    storage_bytes: i64,
    max_storage_bytes: i64,
    bandwidth_bytes: i64,
}

async fn get_usage(
    State(ctx): State<AppContext>,
    Path(streamer_id): Path<String>,
) -> Result<Json<UsageResponse>, ApiError> {
    let counters = ctx.usage.current_counters(&streamer_id).await?;
    let limits = ctx.usage.limits_for(&streamer_id).await?;
    Ok(Json(UsageResponse {
        alerts_count: counters.alerts_count,
        max_alerts: limits.max_alerts,
        tts_chars: counters.tts_chars,
        max_tts_chars: limits.max_tts_chars,
        storage_bytes: counters.storage_bytes,
        max_storage_bytes: limits.max_storage_bytes,
        bandwidth_bytes: counters.bandwidth_bytes,
    }))
}
