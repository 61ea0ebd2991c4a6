//! Core types for the forecast market service
//!
//! This crate defines the data structures shared by the creation service
//! and the HTTP API: item kinds, identifiers, stored items and the
//! creation error taxonomy.

pub mod error;
pub mod item;

pub use error::{CreationError, CreationResult};
pub use item::{CreatableItem, ItemId, ItemKind};
