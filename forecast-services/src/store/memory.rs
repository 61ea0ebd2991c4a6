//! In-memory item store

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use forecast_core::{CreatableItem, ItemId, ItemKind};
use parking_lot::RwLock;

use super::{ItemStore, StoreError};

#[derive(Debug)]
struct KindTable {
    next_id: Option<ItemId>,
    items: BTreeMap<ItemId, CreatableItem>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            next_id: Some(ItemId::FIRST),
            items: BTreeMap::new(),
        }
    }
}

/// Process-lifetime store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<ItemKind, KindTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for MemoryStore {
    fn insert(
        &self,
        kind: ItemKind,
        payload: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Result<CreatableItem, StoreError> {
        let mut tables = self.tables.write();
        let table = tables.entry(kind).or_default();

        let id = table.next_id.ok_or(StoreError::IdSpaceExhausted(kind))?;
        table.next_id = id.next();

        let item = CreatableItem {
            id,
            kind,
            payload,
            created_at,
        };
        table.items.insert(id, item.clone());

        Ok(item)
    }

    fn get(&self, kind: ItemKind, id: ItemId) -> Result<Option<CreatableItem>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .get(&kind)
            .and_then(|table| table.items.get(&id))
            .cloned())
    }

    fn list(&self, kind: ItemKind, limit: usize) -> Result<Vec<CreatableItem>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .get(&kind)
            .map(|table| table.items.values().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, kind: ItemKind) -> Result<usize, StoreError> {
        let tables = self.tables.read();
        Ok(tables.get(&kind).map(|table| table.items.len()).unwrap_or(0))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
