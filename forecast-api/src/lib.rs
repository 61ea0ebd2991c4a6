//! Forecast Market API Server
//!
//! HTTP API that creates markets and predictions and serves the static
//! front-end assets.

pub mod config;
pub mod error;
mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    Router,
};
use forecast_services::{CreationService, ItemStore, MemoryStore, SqliteStore, StoreError};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ApiConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub creation_service: Arc<CreationService>,
}

impl AppState {
    pub fn new(creation_service: CreationService) -> Self {
        Self {
            creation_service: Arc::new(creation_service),
        }
    }
}

/// Open the item store selected by the configuration
pub fn open_store(config: &ApiConfig) -> Result<Arc<dyn ItemStore>, StoreError> {
    match &config.store_db_path {
        Some(path) => {
            info!("Using SQLite item store at: {}", path.display());
            Ok(Arc::new(SqliteStore::new(path)?))
        }
        None => {
            info!("Using in-memory item store (items are lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Build the full application router
pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
