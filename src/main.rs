//! Audio scene trimming service
//!
//! Accepts an audio file (uploaded or by URL) and a time range, cuts the
//! range out with ffmpeg, re-encodes it as MP3 and returns the result.

mod audio_processor;
mod config;
mod error;
mod models;
mod routes;
mod workspace;

use std::net::SocketAddr;
use std::sync::Arc;

use routes::{create_routes, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

const APP_NAME: &str = "scenetrim";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let loaded = ServerConfig::load(&config_path);
    let config = loaded.as_ref().map(Clone::clone).unwrap_or_default();

    init_logging(&config.log_level);
    if let Err(e) = &loaded {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    tracing::info!("{} v{} starting", APP_NAME, env!("CARGO_PKG_VERSION"));

    match which::which(&config.ffmpeg.binary) {
        Ok(path) => tracing::info!("using ffmpeg at {}", path.display()),
        Err(e) => tracing::warn!(
            "{} not found ({}); trims will fail until it is installed",
            config.ffmpeg.binary.display(),
            e
        ),
    }

    let addr: SocketAddr = config.socket_addr().parse()?;
    let state = Arc::new(AppState::new(config)?);
    let app = create_routes(state);

    tracing::info!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{APP_NAME}={level},tower_http=info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
