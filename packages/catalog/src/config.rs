use common::config::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Limits and output geometry for uploaded vehicle images.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Upload size ceiling in bytes. Default: 10 MiB.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Images allowed per vehicle. Default: 20.
    #[serde(default = "default_max_images_per_vehicle")]
    pub max_images_per_vehicle: u64,
    /// Accepted declared MIME types. Default: JPEG, PNG, WebP.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// Bounding box for the normalized full-size derivative. Default: 1920x1440.
    #[serde(default = "default_full_max_width")]
    pub full_max_width: u32,
    #[serde(default = "default_full_max_height")]
    pub full_max_height: u32,
    /// Thumbnail box, filled by crop-to-fit. Default: 300x200.
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
    /// JPEG quality for both derivatives (1-100). Default: 85.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_max_connections() -> u32 {
    10
}
fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_max_images_per_vehicle() -> u64 {
    20
}
fn default_allowed_mime_types() -> Vec<String> {
    vec!["image/jpeg".into(), "image/png".into(), "image/webp".into()]
}
fn default_full_max_width() -> u32 {
    1920
}
fn default_full_max_height() -> u32 {
    1440
}
fn default_thumbnail_width() -> u32 {
    300
}
fn default_thumbnail_height() -> u32 {
    200
}
fn default_jpeg_quality() -> u8 {
    85
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_images_per_vehicle: default_max_images_per_vehicle(),
            allowed_mime_types: default_allowed_mime_types(),
            full_max_width: default_full_max_width(),
            full_max_height: default_full_max_height(),
            thumbnail_width: default_thumbnail_width(),
            thumbnail_height: default_thumbnail_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub media: MediaConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/config")
    }

    /// Load from an explicit config file stem (extension optional).
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("database.url", "sqlite://./data/catalog.db?mode=rwc")?
            // Load from the config file if present
            .add_source(File::with_name(path).required(false))
            // Override from environment (e.g., CATALOG__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CATALOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
