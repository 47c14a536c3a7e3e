use std::sync::Arc;

use common::config::{StorageConfig, StorageKind};
use common::storage::StorageBackend;
use common::storage::filesystem::FilesystemStorage;
use sea_orm::DatabaseConnection;

use crate::auth::{Authenticator, JwtAuthenticator};
use crate::config::AppConfig;
use crate::database::init_db;
use crate::services::{CategoryRegistry, MediaPipeline, VehicleCatalog};

/// Every long-lived component, built once at process start.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub categories: CategoryRegistry,
    pub vehicles: Arc<VehicleCatalog>,
    pub media: Arc<MediaPipeline>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    /// Connect to the database, sync the schema, open the storage backend
    /// and wire the services together.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let db = init_db(&config.database).await?;
        let storage = build_storage(&config.storage).await?;
        Ok(Self::from_parts(config, db, storage))
    }

    pub fn from_parts(
        config: AppConfig,
        db: DatabaseConnection,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let media = Arc::new(MediaPipeline::new(
            db.clone(),
            storage,
            config.media.clone(),
        ));
        let vehicles = Arc::new(VehicleCatalog::new(db.clone(), Arc::clone(&media)));
        let categories = CategoryRegistry::new(db.clone());
        let auth: Arc<dyn Authenticator> =
            Arc::new(JwtAuthenticator::new(&config.auth.jwt_secret));

        Self {
            config: Arc::new(config),
            db,
            categories,
            vehicles,
            media,
            auth,
        }
    }
}

pub async fn build_storage(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match config.backend {
        StorageKind::Filesystem => {
            let store = FilesystemStorage::new(
                config.root.clone(),
                config.public_base_url.clone(),
                config.max_object_size,
            )
            .await?;
            tracing::info!(root = %config.root.display(), "Using filesystem storage");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageKind::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.s3 must be set for the s3 backend"))?;
            let store = common::storage::s3::S3Storage::new(
                s3,
                config.public_base_url.clone(),
                config.max_object_size,
            )?;
            tracing::info!(bucket = %s3.bucket, "Using S3 storage");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "object-storage"))]
        StorageKind::S3 => anyhow::bail!(
            "the s3 storage backend requires the `object-storage` feature"
        ),
    }
}
