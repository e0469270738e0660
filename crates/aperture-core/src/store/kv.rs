//! Key-value record store abstraction.
//!
//! The record store keeps one item per processed image, keyed by the
//! decoded object identifier under the [`IMAGE_KEY`] attribute. Items are
//! trees of [`StoreValue`]s. The store has no native floating-point type,
//! so every numeric leaf is an exact decimal (see the value module).

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use super::value::StoreValue;

/// Primary key attribute name.
pub const IMAGE_KEY: &str = "ImageKey";

/// A persisted record: attribute name to storage value.
pub type StoreItem = BTreeMap<String, StoreValue>;

/// Extract an item's primary key, when present and a string.
pub fn item_key(item: &StoreItem) -> Option<&str> {
    match item.get(IMAGE_KEY) {
        Some(StoreValue::String(key)) => Some(key.as_str()),
        _ => None,
    }
}

/// Record store operation errors.
#[derive(Debug, Error)]
pub enum KvError {
    /// The store could not be reached; distinct from a missing item
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// The item is missing its primary key or is otherwise unstorable
    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

/// Result type for record store operations.
pub type KvResult<T> = Result<T, KvError>;

/// The key-value store holding persisted pipeline records.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Unconditional upsert: create the item or overwrite an existing one
    /// with the same [`IMAGE_KEY`]. Last write wins.
    async fn put_item(&self, item: StoreItem) -> KvResult<()>;

    /// Single-key lookup. `Ok(None)` means the item does not exist; it is
    /// a valid negative result, not an error.
    async fn get_item(&self, key: &str) -> KvResult<Option<StoreItem>>;
}
