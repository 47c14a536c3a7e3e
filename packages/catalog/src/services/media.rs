use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use common::storage::StorageBackend;
use dashmap::DashMap;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::entity::{vehicle, vehicle_image};
use crate::error::AppError;
use crate::media::{self, TransformOptions};
use crate::models::image::*;

/// Ingests, orders and removes vehicle images and their stored derivatives.
///
/// Writers that touch one vehicle's image set hold that vehicle's lock from
/// [`MediaPipeline::lock_vehicle`]. Reads never lock. Lock entries exist only
/// for vehicles that exist.
pub struct MediaPipeline {
    db: DatabaseConnection,
    storage: Arc<dyn StorageBackend>,
    config: MediaConfig,
    transform: TransformOptions,
    locks: DashMap<i32, Arc<Mutex<()>>>,
}

impl MediaPipeline {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageBackend>, config: MediaConfig) -> Self {
        let transform = TransformOptions::from(&config);
        Self {
            db,
            storage,
            config,
            transform,
            locks: DashMap::new(),
        }
    }

    /// Acquire the per-vehicle writer lock, then check the vehicle still
    /// exists. On `NotFound` the entry is released again unless another
    /// caller is holding or waiting on it.
    pub async fn lock_vehicle(&self, vehicle_id: i32) -> Result<OwnedMutexGuard<()>, AppError> {
        let lock = Arc::clone(&self.locks.entry(vehicle_id).or_default());
        let guard = lock.lock_owned().await;

        if let Err(e) = ensure_vehicle(&self.db, vehicle_id).await {
            drop(guard);
            self.release_idle(vehicle_id);
            return Err(e);
        }
        Ok(guard)
    }

    /// Number of vehicles with a lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// Drop the lock entry of a deleted vehicle.
    pub(crate) fn forget_vehicle(&self, vehicle_id: i32) {
        self.locks.remove(&vehicle_id);
    }

    fn release_idle(&self, vehicle_id: i32) {
        self.locks
            .remove_if(&vehicle_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Attach an image to an existing vehicle.
    ///
    /// Checks run in this order: vehicle exists, declared type is allowed,
    /// payload fits the size ceiling, the vehicle has quota left, the bytes
    /// decode as the declared type.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        vehicle_id: i32,
        bytes: Vec<u8>,
        declared_mime: &str,
    ) -> Result<ImageResponse, AppError> {
        let _guard = self.lock_vehicle(vehicle_id).await?;

        let format = self.accept_mime(declared_mime)?;

        let size = bytes.len() as u64;
        if size > self.config.max_upload_bytes {
            return Err(AppError::TooLarge {
                actual: size,
                limit: self.config.max_upload_bytes,
            });
        }

        let held = vehicle_image::Entity::find()
            .filter(vehicle_image::Column::VehicleId.eq(vehicle_id))
            .count(&self.db)
            .await?;
        if held >= self.config.max_images_per_vehicle {
            return Err(AppError::QuotaExceeded {
                limit: self.config.max_images_per_vehicle,
            });
        }

        let derivatives = media::render_blocking(bytes, format, self.transform).await?;

        let filename = format!("{}.jpg", Uuid::now_v7());
        let paths = ImagePaths::new(vehicle_id, &filename);

        let url = self.storage.put(&paths.full, &derivatives.full).await?;
        let thumbnail_url = match self
            .storage
            .put(&paths.thumbnail, &derivatives.thumbnail)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.discard(&[&paths.full]).await;
                return Err(e.into());
            }
        };

        match self
            .insert_row(vehicle_id, filename, url, thumbnail_url)
            .await
        {
            Ok(model) => {
                tracing::info!(
                    image_id = model.id,
                    order = model.display_order,
                    width = derivatives.full_dimensions.0,
                    height = derivatives.full_dimensions.1,
                    "Image uploaded"
                );
                Ok(model.into())
            }
            Err(e) => {
                self.discard(&[&paths.full, &paths.thumbnail]).await;
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ImageResponse, AppError> {
        Ok(find_image(&self.db, id).await?.into())
    }

    pub async fn list_for_vehicle(&self, vehicle_id: i32) -> Result<Vec<ImageResponse>, AppError> {
        Ok(images_of(&self.db, vehicle_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Remove one image. The remaining images are renumbered `0..n-1`.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let vehicle_id = find_image(&self.db, id).await?.vehicle_id;
        let _guard = self.lock_vehicle(vehicle_id).await?;

        // Re-read under the lock; a concurrent delete may have won.
        let image = find_image(&self.db, id).await?;
        self.remove_artifacts(&image).await?;

        let txn = self.db.begin().await?;
        vehicle_image::Entity::delete_by_id(id).exec(&txn).await?;
        compact_orders(&txn, vehicle_id).await?;
        txn.commit().await?;

        tracing::info!(image_id = id, vehicle_id, "Image deleted");
        Ok(())
    }

    /// Swap the display order of two images of the same vehicle.
    #[instrument(skip(self))]
    pub async fn reorder(
        &self,
        vehicle_id: i32,
        swap_a: i32,
        swap_b: i32,
    ) -> Result<Vec<ImageResponse>, AppError> {
        let _guard = self.lock_vehicle(vehicle_id).await?;

        let txn = self.db.begin().await?;
        let first = find_image_for_vehicle(&txn, vehicle_id, swap_a).await?;
        let second = find_image_for_vehicle(&txn, vehicle_id, swap_b).await?;

        if first.id != second.id {
            set_display_order(&txn, first.id, second.display_order).await?;
            set_display_order(&txn, second.id, first.display_order).await?;
            compact_orders(&txn, vehicle_id).await?;
        }
        txn.commit().await?;

        self.list_for_vehicle(vehicle_id).await
    }

    /// Assign display order by position in `req.image_ids`, which must be
    /// exactly the vehicle's current image set.
    #[instrument(skip(self, req))]
    pub async fn set_order(
        &self,
        vehicle_id: i32,
        req: SetImageOrderRequest,
    ) -> Result<Vec<ImageResponse>, AppError> {
        validate_set_image_order(&req)?;
        let _guard = self.lock_vehicle(vehicle_id).await?;

        let txn = self.db.begin().await?;
        let existing: HashSet<i32> = vehicle_image::Entity::find()
            .filter(vehicle_image::Column::VehicleId.eq(vehicle_id))
            .select_only()
            .column(vehicle_image::Column::Id)
            .into_tuple::<i32>()
            .all(&txn)
            .await?
            .into_iter()
            .collect();
        let requested: HashSet<i32> = req.image_ids.iter().copied().collect();
        if existing != requested {
            return Err(AppError::Validation(
                "image_ids must contain exactly the images of this vehicle".into(),
            ));
        }

        for (position, &image_id) in req.image_ids.iter().enumerate() {
            let order = i32::try_from(position)
                .map_err(|_| AppError::Validation("Too many images to reorder".into()))?;
            set_display_order(&txn, image_id, order).await?;
        }
        txn.commit().await?;

        self.list_for_vehicle(vehicle_id).await
    }

    /// Remove every image of a vehicle inside the caller's transaction:
    /// artifacts first, then the metadata rows. The caller holds the
    /// vehicle's lock.
    #[instrument(skip(self, conn))]
    pub async fn purge_vehicle<C: ConnectionTrait>(
        &self,
        conn: &C,
        vehicle_id: i32,
    ) -> Result<u64, AppError> {
        let images = images_of(conn, vehicle_id).await?;
        for image in &images {
            self.remove_artifacts(image).await?;
        }

        let res = vehicle_image::Entity::delete_many()
            .filter(vehicle_image::Column::VehicleId.eq(vehicle_id))
            .exec(conn)
            .await?;

        tracing::debug!(vehicle_id, removed = res.rows_affected, "Images purged");
        Ok(res.rows_affected)
    }

    fn accept_mime(&self, declared: &str) -> Result<image::ImageFormat, AppError> {
        let essence = declared.split(';').next().unwrap_or_default().trim();
        let allowed = self
            .config
            .allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(essence));
        if !allowed {
            return Err(AppError::UnsupportedMedia(format!(
                "Unsupported image type '{declared}'"
            )));
        }
        Ok(media::format_for_mime(essence)?)
    }

    async fn insert_row(
        &self,
        vehicle_id: i32,
        filename: String,
        url: String,
        thumbnail_url: String,
    ) -> Result<vehicle_image::Model, AppError> {
        let txn = self.db.begin().await?;
        let order = next_display_order(&txn, vehicle_id).await?;
        let model = vehicle_image::ActiveModel {
            vehicle_id: Set(vehicle_id),
            filename: Set(filename),
            url: Set(url),
            thumbnail_url: Set(thumbnail_url),
            display_order: Set(order),
            uploaded_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(model)
    }

    async fn remove_artifacts(&self, image: &vehicle_image::Model) -> Result<(), AppError> {
        let paths = ImagePaths::of(image);
        for path in [&paths.full, &paths.thumbnail] {
            if !self.storage.delete(path).await? {
                tracing::debug!(image_id = image.id, path = %path, "Artifact already absent");
            }
        }
        Ok(())
    }

    /// Best-effort cleanup after a failed upload.
    async fn discard(&self, paths: &[&str]) {
        for path in paths {
            if let Err(e) = self.storage.delete(path).await {
                tracing::warn!(path = %path, error = %e, "Failed to remove orphaned artifact");
            }
        }
    }
}

pub(crate) async fn ensure_vehicle<C: ConnectionTrait>(db: &C, vehicle_id: i32) -> Result<(), AppError> {
    vehicle::Entity::find_by_id(vehicle_id)
        .select_only()
        .column(vehicle::Column::Id)
        .into_tuple::<i32>()
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Vehicle not found".into()))
}

pub(crate) async fn images_of<C: ConnectionTrait>(
    db: &C,
    vehicle_id: i32,
) -> Result<Vec<vehicle_image::Model>, AppError> {
    Ok(vehicle_image::Entity::find()
        .filter(vehicle_image::Column::VehicleId.eq(vehicle_id))
        .order_by_asc(vehicle_image::Column::DisplayOrder)
        .order_by_asc(vehicle_image::Column::Id)
        .all(db)
        .await?)
}

async fn find_image<C: ConnectionTrait>(db: &C, id: i32) -> Result<vehicle_image::Model, AppError> {
    vehicle_image::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))
}

async fn find_image_for_vehicle<C: ConnectionTrait>(
    db: &C,
    vehicle_id: i32,
    image_id: i32,
) -> Result<vehicle_image::Model, AppError> {
    let image = find_image(db, image_id).await?;
    if image.vehicle_id != vehicle_id {
        return Err(AppError::NotFound("Image not found".into()));
    }
    Ok(image)
}

async fn next_display_order<C: ConnectionTrait>(db: &C, vehicle_id: i32) -> Result<i32, AppError> {
    let max_order: Option<i32> = vehicle_image::Entity::find()
        .filter(vehicle_image::Column::VehicleId.eq(vehicle_id))
        .select_only()
        .column_as(vehicle_image::Column::DisplayOrder.max(), "max_order")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_order
        .unwrap_or(-1)
        .checked_add(1)
        .ok_or_else(|| AppError::Validation("Display order overflow".into()))
}

async fn set_display_order<C: ConnectionTrait>(db: &C, image_id: i32, order: i32) -> Result<(), AppError> {
    vehicle_image::Entity::update_many()
        .filter(vehicle_image::Column::Id.eq(image_id))
        .col_expr(vehicle_image::Column::DisplayOrder, Expr::value(order))
        .exec(db)
        .await?;
    Ok(())
}

/// Renumber a vehicle's images to `0..n-1`, keeping their relative order.
async fn compact_orders<C: ConnectionTrait>(db: &C, vehicle_id: i32) -> Result<(), AppError> {
    let images = images_of(db, vehicle_id).await?;
    for (position, image) in images.iter().enumerate() {
        let order = i32::try_from(position)
            .map_err(|_| AppError::Validation("Display order overflow".into()))?;
        if image.display_order != order {
            set_display_order(db, image.id, order).await?;
        }
    }
    Ok(())
}
