//! Creatable item definitions (markets and predictions)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of item the service can create
///
/// Markets and predictions share the same lifecycle: they are created once
/// and never mutated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Market,
    Prediction,
}

impl ItemKind {
    /// Every kind, in storage order
    pub const ALL: [ItemKind; 2] = [ItemKind::Market, ItemKind::Prediction];

    /// Lower-case identifier used in JSON and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Market => "market",
            ItemKind::Prediction => "prediction",
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemKind::Market => "Market",
            ItemKind::Prediction => "Prediction",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier assigned by the store at creation time
///
/// Ids are positive and drawn from a per-kind sequence, so a market and a
/// prediction may share the same numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// First id handed out for a kind
    pub const FIRST: ItemId = ItemId(1);

    /// Wrap a raw id. Returns `None` for zero, which is never issued.
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(ItemId(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` when the sequence is exhausted
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(ItemId)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid item id: {}", s))?;
        ItemId::new(raw).ok_or_else(|| format!("Invalid item id: {}", s))
    }
}

/// A market or prediction as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatableItem {
    /// Unique within `kind`, immutable once assigned
    pub id: ItemId,

    /// Whether this is a market or a prediction
    pub kind: ItemKind,

    /// Opaque bytes supplied by the caller
    pub payload: Vec<u8>,

    /// When the item was created
    pub created_at: DateTime<Utc>,
}

impl CreatableItem {
    /// Size of the payload in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// The payload as text, if it is valid UTF-8
    pub fn payload_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ItemKind::Prediction).unwrap();
        assert_eq!(json, "\"prediction\"");
        assert_eq!(ItemKind::Market.to_string(), "market");
    }

    #[test]
    fn test_all_kinds_in_storage_order() {
        let names: Vec<&str> = ItemKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["market", "prediction"]);
    }

    #[test]
    fn test_item_id_rejects_zero() {
        assert!(ItemId::new(0).is_none());
        assert_eq!(ItemId::new(7).unwrap().get(), 7);
        assert!("0".parse::<ItemId>().is_err());
        assert!("abc".parse::<ItemId>().is_err());
        assert_eq!("42".parse::<ItemId>().unwrap().get(), 42);
    }

    #[test]
    fn test_item_id_sequence() {
        assert_eq!(ItemId::FIRST.next().unwrap().get(), 2);
        assert!(ItemId::new(u64::MAX).unwrap().next().is_none());
    }

    #[test]
    fn test_payload_utf8() {
        let mut item = CreatableItem {
            id: ItemId::FIRST,
            kind: ItemKind::Market,
            payload: b"{}".to_vec(),
            created_at: Utc::now(),
        };
        assert_eq!(item.payload_utf8(), Some("{}"));
        assert_eq!(item.payload_len(), 2);

        item.payload = vec![0xff, 0xfe];
        assert!(item.payload_utf8().is_none());
    }
}
