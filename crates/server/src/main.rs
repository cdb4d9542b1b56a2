use anyhow::{self, Error as AnyhowError};
use server::{AppState, routes};
use services::services::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::{assets::ensure_dir, external_services::check_external_tools};

#[derive(Debug, Error)]
pub enum SocialAgentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), SocialAgentError> {
    // Load environment variables from `.env` if present so local development picks up API keys
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)
        .map_err(|e| anyhow::anyhow!("Failed to create tracing filter: {e}"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = AppConfig::from_env()?;

    ensure_dir(&config.media_dir)?;

    let tools = check_external_tools();
    if !tools.media_tools_available() {
        tracing::warn!("ffmpeg/ffprobe not found - branding will fail until they are installed");
    }
    if !config.twilio.is_configured() {
        tracing::warn!("Twilio not configured - WhatsApp replies will not be sent");
    }
    if !config.meta.is_configured() {
        tracing::warn!("Meta credentials missing - publishing to Facebook/Instagram will fail");
    }
    if !config.captioning.is_configured() {
        tracing::warn!("GOOGLE_API_KEY not set - drafts will use the fallback caption");
    }
    if config.dry_run {
        tracing::warn!("DRY_RUN enabled - nothing will be posted to Facebook or Instagram");
    }

    let host = config.host.clone();
    let port = config.port;
    tracing::info!(
        media_dir = %config.media_dir.display(),
        base_url = %config.base_url,
        "Starting social agent"
    );

    let app_router = routes::router(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router).await?;
    Ok(())
}
