//! In-memory object store.

use super::{ObjectInfo, ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Objects live in a `BTreeMap` behind a [`RwLock`], so listings come back
/// sorted by key and every method works on `&self`.
///
/// Keys registered with [`fail_writes_for`](Self::fail_writes_for) reject
/// `put` and `delete` with a backend error, which lets callers exercise the
/// store/delete failure paths.
///
/// ```
/// use bucket_image_optimizer::store::{MemoryStore, ObjectStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::with_objects([("themes/a/cover.png", b"...".to_vec())]);
/// assert_eq!(store.list("themes/").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store. Content types are derived from the key.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, Vec<u8>)>) -> Self {
        let map = objects
            .into_iter()
            .map(|(key, data)| {
                let key = key.into();
                let content_type = crate::format::classify(&key).1.to_string();
                (key, StoredObject { data, content_type })
            })
            .collect();
        Self {
            objects: RwLock::new(map),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make `put` and `delete` fail for this key
    pub async fn fail_writes_for(&self, key: impl Into<String>) {
        self.failing.write().await.insert(key.into());
    }

    /// Body of an object, if present
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|o| o.data.clone())
    }

    /// Content type recorded by the last `put`
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|o| o.content_type.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    async fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.failing.read().await.contains(key) {
            return Err(StoreError::Backend(format!("write rejected for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo::new(key.clone(), object.data.len() as u64))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.object(key)
            .await
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.check_writable(key).await?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key).await?;
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}
