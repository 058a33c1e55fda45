//! Local-filesystem storage backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{StorageError, StorageProvider};

/// Stores objects as files under a root directory.
///
/// Keys map directly to relative paths; parent directories are created
/// on demand. Keys that are empty, absolute, or contain `..` components
/// are rejected before touching the filesystem.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a store rooted at `root`. The directory itself is created
    /// lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to an absolute path inside the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        (dir, storage)
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let (_dir, storage) = store();

        storage.put("users/1/photos/a.png", b"bytes").await.unwrap();
        assert!(storage.exists("users/1/photos/a.png").await.unwrap());
        assert_eq!(storage.get("users/1/photos/a.png").await.unwrap(), b"bytes");

        storage.delete("users/1/photos/a.png").await.unwrap();
        assert!(!storage.exists("users/1/photos/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let (_dir, storage) = store();

        assert!(matches!(
            storage.get("nope").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let (_dir, storage) = store();

        for key in ["", "../outside", "/etc/passwd", "a/../../b"] {
            assert!(
                matches!(storage.put(key, b"x").await, Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
