//! SQLite item store
//!
//! Durable storage for created items. The id sequence is derived from the
//! table itself, so ids keep increasing across restarts.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use forecast_core::{CreatableItem, ItemId, ItemKind};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{ItemStore, StoreError};

/// Item store backed by a SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore instance
    ///
    /// Creates the database file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        info!("Opening item database: {:?}", db_path.as_ref());
        let conn = Connection::open(db_path)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory SqliteStore (useful for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                kind TEXT NOT NULL,
                id INTEGER NOT NULL,
                payload BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (kind, id)
            );
            "#,
        )?;

        Ok(())
    }
}

/// Convert a raw `(id, payload, created_at)` row into an item
fn row_to_item(
    kind: ItemKind,
    (id, payload, created_at_ms): (i64, Vec<u8>, i64),
) -> Result<CreatableItem, StoreError> {
    let id = u64::try_from(id)
        .ok()
        .and_then(ItemId::new)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid {} id {}", kind, id)))?;
    let created_at = DateTime::from_timestamp_millis(created_at_ms).ok_or_else(|| {
        StoreError::Corrupt(format!("invalid timestamp {} for {} {}", created_at_ms, kind, id))
    })?;

    Ok(CreatableItem {
        id,
        kind,
        payload,
        created_at,
    })
}

impl ItemStore for SqliteStore {
    fn insert(
        &self,
        kind: ItemKind,
        payload: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Result<CreatableItem, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let tx = conn.transaction()?;

        let last_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM items WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        let raw_id = last_id
            .checked_add(1)
            .ok_or(StoreError::IdSpaceExhausted(kind))?;

        tx.execute(
            r#"
            INSERT INTO items (kind, id, payload, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![kind.as_str(), raw_id, payload, created_at.timestamp_millis()],
        )?;
        tx.commit()?;

        // Read back through the same conversion as `get` so the returned
        // timestamp has the stored (millisecond) precision.
        row_to_item(kind, (raw_id, payload, created_at.timestamp_millis()))
    }

    fn get(&self, kind: ItemKind, id: ItemId) -> Result<Option<CreatableItem>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let Ok(raw_id) = i64::try_from(id.get()) else {
            return Ok(None);
        };

        let row: Option<(i64, Vec<u8>, i64)> = conn
            .query_row(
                "SELECT id, payload, created_at FROM items WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), raw_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|row| row_to_item(kind, row)).transpose()
    }

    fn list(&self, kind: ItemKind, limit: usize) -> Result<Vec<CreatableItem>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, payload, created_at FROM items
            WHERE kind = ?1
            ORDER BY id ASC
            LIMIT ?2
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![kind.as_str(), limit], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<(i64, Vec<u8>, i64)>, _>>()?;

        rows.into_iter().map(|row| row_to_item(kind, row)).collect()
    }

    fn count(&self, kind: ItemKind) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
