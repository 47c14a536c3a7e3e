use async_trait::async_trait;

use super::error::StorageError;

/// Path-addressed object storage for media artifacts.
///
/// Local disk and remote object stores are interchangeable behind this trait.
/// Paths are relative, `/`-separated keys such as `vehicles/7/thumbs/a.jpg`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store bytes at `path`, replacing any existing object, and return its public URL.
    async fn put(&self, path: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Retrieve all bytes stored at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the object at `path`.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Public URL under which the object at `path` is served.
    fn url_for(&self, path: &str) -> String;
}
