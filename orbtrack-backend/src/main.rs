use std::sync::Arc;

use anyhow::{Context, Result};

use orbtrack_backend::config;
use orbtrack_backend::logging;
use orbtrack_backend::module::tracking::TrackingManager;
use orbtrack_backend::service::{self, AppState};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::read_config(&config_path)?;

    // Initialize logging
    let _logging_guard = logging::init_logging(&config.log_dir, "orbtrack-backend", &config.log_level)?;

    tracing::info!("Orbtrack backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    let manager = Arc::new(
        TrackingManager::from_config(config)
            .await
            .context("Failed to initialize tracking manager")?,
    );

    // Ingestion can take a while; serve empty snapshots until it is done
    let starting = {
        let manager = manager.clone();
        tokio::spawn(async move {
            match manager.start().await {
                Ok(()) => tracing::info!("Tracking started"),
                Err(e) => tracing::warn!("Tracking did not start: {}", e),
            }
        })
    };

    let app = service::router(AppState::from_manager(&manager));
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address()))?;
    tracing::info!("HTTP server listening on {}", config.server_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    starting.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
