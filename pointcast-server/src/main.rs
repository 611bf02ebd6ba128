// File: pointcast-server/src/main.rs

use std::env;
use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use pointcast_core::crypto::TokenCipher;
use pointcast_core::overlay::{overlay_router, OverlayHub};
use pointcast_core::platforms::twitch::{OAuthClient, TwitchOAuthClient};
use pointcast_core::platforms::RedemptionHandler;
use pointcast_core::repositories::postgres::{
    PostgresAccountRepository, PostgresCredentialsRepository, PostgresTriggerRepository,
    PostgresUsageRepository,
};
use pointcast_core::services::{
    AuthService, ListenerManager, RedemptionService, TokenService, TriggerService, UsageService,
};
use pointcast_core::Database;
use pointcast_common::traits::repository_traits::{
    AccountRepository, CredentialsRepository, TriggerRepository, UsageRepository,
};

mod routes;
use routes::{api_router, AppContext};

#[derive(Parser, Debug, Clone)]
#[command(name = "pointcast")]
#[command(author, version, about = "PointCast - channel-point redemption alerts for stream overlays")]
struct Args {
    /// Address the HTTP/WebSocket server binds to
    #[arg(long, default_value = "0.0.0.0:8080")]
    server_addr: String,

    /// Postgres connection URL
    #[arg(long, default_value = "postgres://pointcast@localhost:5432/pointcast")]
    db_url: String,

    /// Public base URL media storage keys resolve against
    #[arg(long, default_value = "https://media.pointcast.app")]
    media_base_url: String,

    /// Public base URL of this server, used for the OAuth redirect
    #[arg(long, default_value = "http://localhost:8080")]
    public_base_url: String,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("pointcast=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

fn required_env(name: &str) -> anyhow::Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{name} must be set"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("PointCast starting. addr={}", args.server_addr);

    let enc_key = required_env("POINTCAST_ENC_KEY")?;
    let client_id = required_env("TWITCH_CLIENT_ID")?;
    let client_secret = required_env("TWITCH_CLIENT_SECRET")?;
    let cipher = TokenCipher::from_base64_key(&enc_key)?;

    let db = Database::new(&args.db_url).await?;
    db.migrate().await?;
    info!("database migrations applied");

    let credentials: Arc<dyn CredentialsRepository> = Arc::new(PostgresCredentialsRepository::new(
        db.pool().clone(),
        cipher,
    ));
    let triggers: Arc<dyn TriggerRepository> =
        Arc::new(PostgresTriggerRepository::new(db.pool().clone()));
    let usage_repo: Arc<dyn UsageRepository> =
        Arc::new(PostgresUsageRepository::new(db.pool().clone()));
    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(db.pool().clone()));

    let oauth = Arc::new(TwitchOAuthClient::new(client_id.clone(), client_secret));
    let tokens = Arc::new(TokenService::new(
        Arc::clone(&credentials),
        Arc::clone(&oauth) as Arc<dyn OAuthClient>,
    ));

    let usage = Arc::new(UsageService::new(
        Arc::clone(&usage_repo),
        Arc::clone(&accounts),
    ));

    let hub = Arc::new(OverlayHub::new());
    let redemptions: Arc<RedemptionService> = Arc::new(RedemptionService::new(
        Arc::clone(&triggers),
        Arc::clone(&hub),
        Arc::clone(&usage),
        args.media_base_url.clone(),
    ));

    let listeners = Arc::new(ListenerManager::new(
        Arc::clone(&credentials),
        Arc::clone(&tokens),
        Arc::clone(&redemptions) as Arc<dyn RedemptionHandler>,
        client_id,
    ));
    let restored = listeners.restore_all().await?;
    info!(restored, "redemption listeners restored from stored credentials");

    let trigger_svc = Arc::new(TriggerService::new(
        Arc::clone(&triggers),
        Arc::clone(&usage),
    ));
    let auth = Arc::new(AuthService::new(
        Arc::clone(&oauth) as Arc<dyn OAuthClient>,
        Arc::clone(&tokens),
        Arc::clone(&accounts),
        Arc::clone(&listeners),
    ));

    let ctx = AppContext {
        oauth,
        auth,
        triggers: trigger_svc,
        usage,
        redirect_uri: format!("{}/auth/twitch/callback", args.public_base_url.trim_end_matches('/')),
    };

    let app = overlay_router(Arc::clone(&hub))
        .merge(api_router(ctx))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&args.server_addr).await?;
    info!("listening on {}", args.server_addr);

    let shutdown_listeners = Arc::clone(&listeners);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {e}");
            }
            info!("shutdown signal received");
            shutdown_listeners.shutdown();
        })
        .await?;

    info!("PointCast stopped");
    Ok(())
}
