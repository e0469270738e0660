//! Storage abstractions consumed by the pipeline stages.
//!
//! Two stores exist at the boundary: the [`ObjectStore`] holding original
//! uploads and derived thumbnails, and the [`KvStore`] holding the
//! persisted pipeline records. Both are traits so stages stay decoupled
//! from any concrete backend; in-memory and local-filesystem backends are
//! provided for tests and single-machine runs.
//!
//! Object keys are always the *decoded* object identifier; see the
//! trigger parser.

mod kv;
mod local;
mod memory;
mod value;

pub use kv::{item_key, KvError, KvResult, KvStore, StoreItem, IMAGE_KEY};
pub use local::{FileKvStore, LocalObjectStore};
pub use memory::{MemoryKvStore, MemoryObjectStore};
pub use value::{normalize, Document, NumericError, StoreValue};

use async_trait::async_trait;
use thiserror::Error;

/// Object store operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Read failed for {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Write failed for {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for object store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The object store holding originals and derived thumbnails.
///
/// Calls are synchronous single attempts from the pipeline's perspective;
/// retry and timeout policy belongs to the orchestrator or the client
/// library behind an implementation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object, overwriting any existing one at the same key.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;
}
