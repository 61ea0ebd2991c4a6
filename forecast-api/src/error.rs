//! Mapping from service and routing errors to HTTP responses

use axum::{
    extract::OriginalUri,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use forecast_core::CreationError;
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by API handlers
///
/// Every variant becomes a non-200 status with a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Creation(#[from] CreationError),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error("No route for {0}")]
    RouteNotFound(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Creation(e) => match e {
                CreationError::Io(_) => StatusCode::BAD_REQUEST,
                CreationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                CreationError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                CreationError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                CreationError::NotFound { .. } => StatusCode::NOT_FOUND,
                CreationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Creation(e) => e.code(),
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::RouteNotFound(_) => "route_not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Creation(e) if !e.is_client_error() => {
                error!(code = self.code(), "Request failed: {}", self)
            }
            _ => warn!(code = self.code(), "Request rejected: {}", self),
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Fallback for paths that exist but not for the request's method
pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
    }
}

/// Fallback for unknown API paths
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
