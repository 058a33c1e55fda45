//! Object storage seam for user photos.
//!
//! The orchestration core only needs put/get/delete/exists over opaque
//! keys; which backend sits behind that (local disk, S3, ...) is a
//! deployment choice. [`LocalStorage`] is the bundled implementation.

use async_trait::async_trait;

pub mod local;

pub use local::LocalStorage;

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object exists under the key.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The key is malformed (empty, absolute, or escaping the root).
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asynchronous object store keyed by `/`-separated relative paths.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store `bytes` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetch the object under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the object under `key`. Deleting a missing key is an error
    /// (`NotFound`) so callers can distinguish cleanup from no-op.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}
