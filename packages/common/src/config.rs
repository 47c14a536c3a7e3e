use std::path::PathBuf;

use serde::Deserialize;

/// Which storage backend holds media artifacts.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Filesystem,
    S3,
}

/// Settings for an S3-compatible bucket. Only used by the `s3` backend.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    /// Region name, e.g. "ap-northeast-1". Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2).
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Use path-style addressing. Default: false.
    #[serde(default)]
    pub path_style: bool,
}

/// App-level storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend kind. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageKind,
    /// Root directory for the filesystem backend. Default: "./data/media".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Base URL prepended to object paths. Default: "/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Hard ceiling on a single stored object in bytes. Default: 32 MiB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    #[serde(default)]
    pub s3: Option<S3Config>,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/media")
}
fn default_public_base_url() -> String {
    "/media".into()
}
fn default_max_object_size() -> u64 {
    32 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            max_object_size: default_max_object_size(),
            s3: None,
        }
    }
}
