//! Error types for item creation and lookup

use std::time::Duration;

use thiserror::Error;

use crate::item::{ItemId, ItemKind};

/// Errors surfaced by the creation service
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: usize },

    #[error("Timed out reading request body after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {kind} {id}")]
    NotFound { kind: ItemKind, id: ItemId },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CreationError {
    pub fn io(msg: impl Into<String>) -> Self {
        CreationError::Io(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        CreationError::InvalidRequest(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        CreationError::Storage(msg.into())
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            CreationError::Io(_) => "io_error",
            CreationError::InvalidRequest(_) => "invalid_request",
            CreationError::PayloadTooLarge { .. } => "payload_too_large",
            CreationError::Timeout(_) => "timeout",
            CreationError::NotFound { .. } => "not_found",
            CreationError::Storage(_) => "storage_error",
        }
    }

    /// Whether the caller caused the failure (as opposed to the server)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CreationError::Storage(_))
    }
}

/// Result type alias for creation operations
pub type CreationResult<T> = Result<T, CreationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CreationError::io("reset").code(), "io_error");
        assert_eq!(CreationError::invalid_request("empty").code(), "invalid_request");
        assert_eq!(
            CreationError::PayloadTooLarge { size: 10, limit: 5 }.code(),
            "payload_too_large"
        );
        assert_eq!(CreationError::storage("disk").code(), "storage_error");
    }

    #[test]
    fn test_error_messages() {
        let err = CreationError::PayloadTooLarge { size: 2048, limit: 1024 };
        assert_eq!(
            err.to_string(),
            "Payload too large: 2048 bytes exceeds limit of 1024 bytes"
        );

        let err = CreationError::NotFound {
            kind: ItemKind::Prediction,
            id: ItemId::FIRST,
        };
        assert_eq!(err.to_string(), "Not found: prediction 1");
    }

    #[test]
    fn test_client_errors() {
        assert!(CreationError::Timeout(Duration::from_secs(1)).is_client_error());
        assert!(!CreationError::storage("locked").is_client_error());
    }
}
