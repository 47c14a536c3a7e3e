use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::key::validate_storage_path;
use super::traits::StorageBackend;
use super::join_url;

/// Filesystem-backed object store.
///
/// Objects live at `{base_path}/{path}`; writes go through a temp file in
/// `{base_path}/.tmp` followed by an atomic rename, so a reader never sees a
/// partially written artifact.
#[derive(Debug)]
pub struct FilesystemStorage {
    base_path: PathBuf,
    public_base_url: String,
    max_size: u64,
}

impl FilesystemStorage {
    /// Create a new filesystem store rooted at `base_path`.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }

    /// Compute the filesystem path for a validated object path.
    fn object_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let path = validate_storage_path(path)?;
        Ok(self.base_path.join(path))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, path: &str, data: &[u8]) -> Result<String, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let object_path = self.object_path(path)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(self.url_for(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let object_path = self.object_path(path)?;
        match fs::read(&object_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let object_path = self.object_path(path)?;
        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let object_path = self.object_path(path)?;
        Ok(fs::try_exists(&object_path).await?)
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }
}
