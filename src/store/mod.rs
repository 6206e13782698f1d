//! # Object Store Module
//!
//! Confine con lo storage remoto: il core vede solo un'interfaccia key/value.
//!
//! ## Responsabilità:
//! - Definisce il trait `ObjectStore` (list / get / put / delete)
//! - Definisce `StoreError` per gli errori del backend
//! - Fornisce tre implementazioni:
//!   - `S3Store`: bucket S3-compatibili (Cloudflare R2, MinIO, AWS)
//!   - `LocalStore`: una directory locale trattata come bucket
//!   - `MemoryStore`: mappa in memoria per test e embedding
//!
//! ## Semantica:
//! - Le key sono stringhe opache path-like (`a/b/c.png`)
//! - Nessun retry: un singolo fallimento è terminale per l'oggetto
//! - Nessun timeout imposto qui, vale il default del client

mod local;
mod memory;
mod s3;

pub use self::local::LocalStore;
pub use self::memory::MemoryStore;
pub use self::s3::S3Store;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Shared handle passed to every worker
pub type StoreHandle = Arc<dyn ObjectStore>;

/// One entry returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self { key: key.into(), size }
    }
}

/// Errors raised at the object store boundary
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Key/value blob interface over a bucket.
///
/// Implementations must be usable from many workers at once through
/// `&self`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name, for logging only
    fn name(&self) -> &str;

    /// List every object whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError>;

    /// Fetch the full object body. Missing keys yield [`StoreError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite an object
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StoreError>;

    /// Remove an object
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
