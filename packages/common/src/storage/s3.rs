use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;

use super::error::StorageError;
use super::key::validate_storage_path;
use super::traits::StorageBackend;
use super::{content_type_for, join_url};
use crate::config::S3Config;

/// S3-compatible object store (AWS S3, MinIO, R2, ...).
pub struct S3Storage {
    bucket: Box<Bucket>,
    public_base_url: String,
    max_size: u64,
}

impl S3Storage {
    pub fn new(
        config: &S3Config,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(backend)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn unexpected_status(op: &str, path: &str, code: u16) -> StorageError {
    StorageError::Backend(format!("{op} {path} returned HTTP {code}"))
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn put(&self, path: &str, data: &[u8]) -> Result<String, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }
        let path = validate_storage_path(path)?;

        let response = self
            .bucket
            .put_object_with_content_type(path, data, content_type_for(path))
            .await
            .map_err(backend)?;
        let code = response.status_code();
        if !(200..300).contains(&code) {
            return Err(unexpected_status("PUT", path, code));
        }

        Ok(self.url_for(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = validate_storage_path(path)?;
        match self.bucket.get_object(path).await {
            Ok(response) if response.status_code() == 404 => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Ok(response) if (200..300).contains(&response.status_code()) => {
                Ok(response.bytes().to_vec())
            }
            Ok(response) => Err(unexpected_status("GET", path, response.status_code())),
            Err(S3Error::HttpFailWithBody(404, _)) => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let path = validate_storage_path(path)?;
        // S3 DELETE is idempotent and does not report whether the key existed.
        let existed = self.exists(path).await?;
        if !existed {
            return Ok(false);
        }
        match self.bucket.delete_object(path).await {
            Ok(response) if (200..300).contains(&response.status_code()) => Ok(true),
            Ok(response) if response.status_code() == 404 => Ok(false),
            Ok(response) => Err(unexpected_status("DELETE", path, response.status_code())),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = validate_storage_path(path)?;
        match self.bucket.head_object(path).await {
            Ok((_, code)) if (200..300).contains(&code) => Ok(true),
            Ok((_, 404)) => Ok(false),
            Ok((_, code)) => Err(unexpected_status("HEAD", path, code)),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }
}
