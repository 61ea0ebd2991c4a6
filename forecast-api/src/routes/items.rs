//! Market and prediction endpoints
//!
//! Creation endpoints take the raw request body as the item payload. Lookup
//! endpoints echo stored items back as JSON.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use forecast_core::{CreatableItem, CreationError, ItemId, ItemKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Response from a successful creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemResponse {
    pub success: bool,
    pub kind: ItemKind,
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
}

impl From<&CreatableItem> for CreateItemResponse {
    fn from(item: &CreatableItem) -> Self {
        Self {
            success: true,
            kind: item.kind,
            id: item.id,
            created_at: item.created_at,
        }
    }
}

/// How a payload is rendered in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    Utf8,
    Base64,
}

/// A stored item as returned by lookups
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub kind: ItemKind,
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    pub payload: String,
    pub payload_encoding: PayloadEncoding,
    pub size: usize,
}

impl From<&CreatableItem> for ItemView {
    fn from(item: &CreatableItem) -> Self {
        let (payload, payload_encoding) = match item.payload_utf8() {
            Some(text) => (text.to_string(), PayloadEncoding::Utf8),
            None => (STANDARD.encode(&item.payload), PayloadEncoding::Base64),
        };

        Self {
            kind: item.kind,
            id: item.id,
            created_at: item.created_at,
            payload,
            payload_encoding,
            size: item.payload_len(),
        }
    }
}

/// Query parameters for listing items
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    /// Maximum number of results
    pub limit: Option<usize>,
}

/// Response for listing items
#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemView>,
    pub count: usize,
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn create_market(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CreateItemResponse>, ApiError> {
    create_item(ItemKind::Market, state, headers, body).await
}

async fn create_prediction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CreateItemResponse>, ApiError> {
    create_item(ItemKind::Prediction, state, headers, body).await
}

async fn create_item(
    kind: ItemKind,
    state: AppState,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CreateItemResponse>, ApiError> {
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    debug!(kind = %kind, ?declared_len, "Create request received");

    let item = state
        .creation_service
        .create_from_stream(kind, body.into_data_stream(), declared_len)
        .await?;

    Ok(Json(CreateItemResponse::from(&item)))
}

async fn list_markets(
    State(state): State<AppState>,
    query: Result<Query<ListItemsQuery>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    list_items(ItemKind::Market, state, query)
}

async fn list_predictions(
    State(state): State<AppState>,
    query: Result<Query<ListItemsQuery>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    list_items(ItemKind::Prediction, state, query)
}

fn list_items(
    kind: ItemKind,
    state: AppState,
    query: Result<Query<ListItemsQuery>, QueryRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| CreationError::invalid_request(e.body_text()))?;

    let items: Vec<ItemView> = state
        .creation_service
        .list_items(kind, query.limit)?
        .iter()
        .map(ItemView::from)
        .collect();

    let count = items.len();
    Ok(Json(ItemsResponse { items, count }))
}

async fn get_market(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemView>, ApiError> {
    get_item(ItemKind::Market, state, &id)
}

async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemView>, ApiError> {
    get_item(ItemKind::Prediction, state, &id)
}

fn get_item(kind: ItemKind, state: AppState, raw_id: &str) -> Result<Json<ItemView>, ApiError> {
    let id: ItemId = raw_id.parse().map_err(CreationError::invalid_request)?;
    let item = state.creation_service.get_item(kind, id)?;
    Ok(Json(ItemView::from(&item)))
}

/// Create item routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/CreateMarket", post(create_market))
        .route("/CreatePrediction", post(create_prediction))
        .route("/markets", get(list_markets))
        .route("/markets/{id}", get(get_market))
        .route("/predictions", get(list_predictions))
        .route("/predictions/{id}", get(get_prediction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(payload: &[u8]) -> CreatableItem {
        CreatableItem {
            id: ItemId::FIRST,
            kind: ItemKind::Prediction,
            payload: payload.to_vec(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_keeps_utf8_payload() {
        let view = ItemView::from(&item(b"{\"q\":\"rain?\"}"));
        assert_eq!(view.payload, "{\"q\":\"rain?\"}");
        assert_eq!(view.payload_encoding, PayloadEncoding::Utf8);
        assert_eq!(view.size, 13);
    }

    #[test]
    fn test_view_encodes_binary_payload() {
        let view = ItemView::from(&item(&[0xff, 0x00, 0x10]));
        assert_eq!(view.payload, "/wAQ");
        assert_eq!(view.payload_encoding, PayloadEncoding::Base64);
    }

    #[test]
    fn test_create_response_shape() {
        let json = serde_json::to_value(CreateItemResponse::from(&item(b"{}"))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["kind"], "prediction");
        assert_eq!(json["id"], 1);
        assert!(json.get("createdAt").is_some());
    }
}
