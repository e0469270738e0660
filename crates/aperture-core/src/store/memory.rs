//! In-memory store backends for tests and single-process runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::kv::{item_key, KvError, KvResult, KvStore, StoreItem};
use super::{ObjectStore, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Object store backed by a process-local map.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object exists at the given location.
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .await
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Recorded content type of an object, if present.
    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    /// Number of stored objects across all buckets.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.objects.lock().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Record store backed by a process-local map.
#[derive(Default)]
pub struct MemoryKvStore {
    items: Mutex<HashMap<String, StoreItem>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn put_item(&self, item: StoreItem) -> KvResult<()> {
        let key = item_key(&item)
            .ok_or_else(|| KvError::InvalidItem("item has no string ImageKey".to_string()))?
            .to_string();
        self.items.lock().await.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, key: &str) -> KvResult<Option<StoreItem>> {
        Ok(self.items.lock().await.get(key).cloned())
    }
}
