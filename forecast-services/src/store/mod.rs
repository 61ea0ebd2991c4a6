//! Item storage backends
//!
//! The store owns its container and the lock guarding it. Ids are assigned
//! inside that critical section, so concurrent inserts never share an id.

mod memory;
mod sqlite;

use chrono::{DateTime, Utc};
use forecast_core::{CreatableItem, CreationError, ItemId, ItemKind};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage for created items
pub trait ItemStore: Send + Sync {
    /// Assign the next id for `kind` and store the item under it
    fn insert(
        &self,
        kind: ItemKind,
        payload: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Result<CreatableItem, StoreError>;

    /// Look up a single item
    fn get(&self, kind: ItemKind, id: ItemId) -> Result<Option<CreatableItem>, StoreError>;

    /// Items of one kind in ascending id order, at most `limit` of them
    fn list(&self, kind: ItemKind, limit: usize) -> Result<Vec<CreatableItem>, StoreError>;

    /// Number of stored items of one kind
    fn count(&self, kind: ItemKind) -> Result<usize, StoreError>;

    /// Short backend name for logging and health reporting
    fn backend(&self) -> &'static str;
}

/// Errors that can occur during item storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Id space exhausted for {0}")]
    IdSpaceExhausted(ItemKind),
}

impl From<StoreError> for CreationError {
    fn from(e: StoreError) -> Self {
        CreationError::storage(e.to_string())
    }
}
