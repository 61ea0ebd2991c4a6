//! Forecast Market API Server entry point

use anyhow::Context;
use forecast_api::{build_router, config::ApiConfig, open_store, AppState};
use forecast_services::CreationService;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,forecast_api=debug,tower_http=debug")),
        )
        .init();

    info!("Starting Forecast Market API");

    let config = ApiConfig::from_env().context("Invalid server configuration")?;
    info!(
        "Body limits: {} bytes, {:?} read timeout",
        config.max_payload_bytes, config.read_timeout
    );

    let store = open_store(&config).context("Failed to open item store")?;
    let creation_service = CreationService::new(store, config.limits());
    let state = AppState::new(creation_service);

    info!("Serving static assets from: {}", config.static_dir.display());
    let app = build_router(state, &config.static_dir);

    // Start server
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down server...");
}
