//! Local filesystem store backends.
//!
//! `LocalObjectStore` lays objects out as `{root}/{bucket}/{key}` so a
//! single data directory can stand in for the production object store on a
//! developer machine. `FileKvStore` keeps the whole record table in one
//! JSON file, rewritten atomically on every upsert, which is fine for the
//! volumes a local run sees.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::kv::{item_key, KvError, KvResult, KvStore, StoreItem};
use super::{ObjectStore, StorageError, StorageResult};

/// Object store rooted at a local directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a bucket/key pair to a filesystem path.
    ///
    /// Keys containing traversal sequences are rejected so a crafted key
    /// cannot escape the data directory.
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        for part in [bucket, key] {
            if part.is_empty()
                || part.starts_with('/')
                || part.split('/').any(|segment| segment == "..")
            {
                return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => Err(StorageError::ReadFailed {
                key: format!("{bucket}/{key}"),
                message: e.to_string(),
            }),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed {
                    key: format!("{bucket}/{key}"),
                    message: e.to_string(),
                })?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: format!("{bucket}/{key}"),
                message: e.to_string(),
            })
    }
}

/// Record store persisted as a single JSON file.
pub struct FileKvStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> KvResult<BTreeMap<String, StoreItem>> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| KvError::Unavailable(format!("record file is corrupt: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(KvError::Unavailable(e.to_string())),
        }
    }

    async fn save(&self, table: &BTreeMap<String, StoreItem>) -> KvResult<()> {
        let json = serde_json::to_vec_pretty(table)
            .map_err(|e| KvError::InvalidItem(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| KvError::Unavailable(e.to_string()))?;
        }
        // Write to a sibling temp file then rename, so readers never see a
        // partially written table
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn put_item(&self, item: StoreItem) -> KvResult<()> {
        let key = item_key(&item)
            .ok_or_else(|| KvError::InvalidItem("item has no string ImageKey".to_string()))?
            .to_string();

        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;
        table.insert(key, item);
        self.save(&table).await
    }

    async fn get_item(&self, key: &str) -> KvResult<Option<StoreItem>> {
        Ok(self.load().await?.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreValue, IMAGE_KEY};

    #[tokio::test]
    async fn test_local_object_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store
            .put("b", "uploads/cat.jpg", vec![9, 9], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(store.get("b", "uploads/cat.jpg").await.unwrap(), vec![9, 9]);
    }

    #[tokio::test]
    async fn test_local_object_store_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.get("b", "nope.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_object_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.get("b", "../escape.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_file_kv_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let mut item = StoreItem::new();
        item.insert(IMAGE_KEY.to_string(), StoreValue::String("uploads/cat.jpg".into()));
        FileKvStore::new(&path).put_item(item).await.unwrap();

        let reopened = FileKvStore::new(&path);
        let got = reopened.get_item("uploads/cat.jpg").await.unwrap();
        assert!(got.is_some());
        assert!(reopened.get_item("uploads/other.jpg").await.unwrap().is_none());
    }
}
