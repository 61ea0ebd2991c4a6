//! Business logic services for the forecast market service
//!
//! This crate provides the creation service that validates and stores new
//! markets and predictions, along with the storage backends it writes to.

pub mod creation;
pub mod store;

pub use creation::{
    CreationLimits, CreationService, DEFAULT_LIST_LIMIT, DEFAULT_MAX_PAYLOAD_BYTES,
    DEFAULT_READ_TIMEOUT_SECS, MAX_LIST_LIMIT,
};
pub use store::{ItemStore, MemoryStore, SqliteStore, StoreError};
