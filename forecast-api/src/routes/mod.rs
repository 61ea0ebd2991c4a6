//! API route definitions

mod health;
mod items;

use axum::Router;
use crate::error::{method_not_allowed, route_not_found};
use crate::AppState;

/// Create all API routes
///
/// Unknown paths and unsupported methods answer with the JSON error body.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(items::routes())
        .merge(health::routes())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
}
