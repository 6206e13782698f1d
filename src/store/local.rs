//! Local directory backend.
//!
//! Treats a directory as a bucket: keys are `/`-joined paths relative to the
//! root. Content types are not persisted.

use super::{ObjectInfo, ObjectStore, StoreError};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Backend(format!(
                "bucket directory does not exist: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Resolve a key under the root, rejecting anything that would escape it
    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::Backend(format!("invalid key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn map_io(key: &str, err: std::io::Error) -> StoreError {
        if err.kind() == ErrorKind::NotFound {
            StoreError::NotFound(key.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let root = self.root.clone();
        let store = self.clone();
        let prefix = prefix.to_string();

        // walkdir è sincrono: lo spostiamo fuori dal runtime
        tokio::task::spawn_blocking(move || {
            let mut objects = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(key) = store.key_for(entry.path()) else {
                    continue;
                };
                if key.starts_with(&prefix) {
                    let size = entry.metadata().map_err(|e| StoreError::Backend(e.to_string()))?.len();
                    objects.push(ObjectInfo::new(key, size));
                }
            }
            Ok(objects)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("listing task failed: {}", e)))?
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| Self::map_io(key, e))
    }

    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let parent = match path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Err(StoreError::Backend(format!("invalid key: {}", key))),
        };
        fs::create_dir_all(&parent).await?;

        // File temporaneo univoco nella stessa directory, poi persist atomico:
        // nessun oggetto troncato, nessuna collisione tra key con lo stesso stem
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = NamedTempFile::new_in(&parent)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("write task failed: {}", e)))?
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).await.map_err(|e| Self::map_io(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();

        store.put("themes/a/cover.png", vec![1, 2, 3], "image/png").await.unwrap();
        store.put("themes/b/hero.jpg", vec![4, 5], "image/jpeg").await.unwrap();
        store.put("other/x.gif", vec![6], "image/gif").await.unwrap();

        let listed = store.list("themes/").await.unwrap();
        assert_eq!(
            listed,
            vec![ObjectInfo::new("themes/a/cover.png", 3), ObjectInfo::new("themes/b/hero.jpg", 2)]
        );

        assert_eq!(store.get("themes/b/hero.jpg").await.unwrap(), vec![4, 5]);
        store.delete("themes/b/hero.jpg").await.unwrap();
        assert!(matches!(store.get("themes/b/hero.jpg").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.put("/abs.png", vec![], "image/png").await.is_err());
    }

    #[test]
    fn test_missing_root() {
        assert!(LocalStore::new("/definitely/not/a/bucket").is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_with_same_stem() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();

        for round in 0..50u8 {
            let png = vec![round; 4096];
            let jpg = vec![round.wrapping_add(128); 8192];
            let (a, b) = tokio::join!(
                store.put("a/x.png", png.clone(), "image/png"),
                store.put("a/x.jpg", jpg.clone(), "image/jpeg"),
            );
            a.unwrap();
            b.unwrap();
            assert_eq!(store.get("a/x.png").await.unwrap(), png);
            assert_eq!(store.get("a/x.jpg").await.unwrap(), jpg);
        }

        // Nessun file temporaneo rimasto nel bucket
        let listed = store.list("a/").await.unwrap();
        assert_eq!(listed, vec![ObjectInfo::new("a/x.jpg", 8192), ObjectInfo::new("a/x.png", 4096)]);
    }
}
