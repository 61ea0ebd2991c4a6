//! Health check endpoints

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use forecast_core::ItemKind;
use serde::Serialize;
use tracing::error;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    /// Stored item count per kind; absent when the store cannot be read
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<BTreeMap<ItemKind, usize>>,
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let service = &state.creation_service;
    let counts = ItemKind::ALL
        .iter()
        .map(|&kind| service.count_items(kind).map(|count| (kind, count)))
        .collect::<Result<BTreeMap<_, _>, _>>();

    match counts {
        Ok(counts) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                store: service.backend(),
                items: Some(counts),
            }),
        ),
        Err(e) => {
            error!("Health check could not read store: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: service.backend(),
                    items: None,
                }),
            )
        }
    }
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
