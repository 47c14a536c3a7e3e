use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::VehicleStatus;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::LikeExpr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, vehicle, vehicle_image};
use crate::error::AppError;
use crate::models::image::ImageResponse;
use crate::models::shared::escape_like;
use crate::models::vehicle::*;

use super::category::{find_by_slug, find_category, resolve_slug};
use super::media::{MediaPipeline, images_of};

pub const DEFAULT_RELATED_LIMIT: u64 = 4;

/// Inventory records: validation, persistence, filtering, search and
/// recommendations. Owns the cascade into [`MediaPipeline`] on delete.
pub struct VehicleCatalog {
    db: DatabaseConnection,
    media: Arc<MediaPipeline>,
}

impl VehicleCatalog {
    pub fn new(db: DatabaseConnection, media: Arc<MediaPipeline>) -> Self {
        Self { db, media }
    }

    #[instrument(skip(self, input), fields(category = %input.category))]
    pub async fn create(&self, input: VehicleInput) -> Result<VehicleResponse, AppError> {
        validate_vehicle_input(&input)?;
        let features_json = encode_features(&input.features)?;
        let haystack = search_text(&input);

        let txn = self.db.begin().await?;
        let category = resolve_slug(&txn, &input.category).await?;

        let now = Utc::now();
        let model = vehicle::ActiveModel {
            category_id: Set(category.id),
            make: Set(input.make.trim().to_string()),
            model: Set(input.model.trim().to_string()),
            year: Set(input.year),
            mileage: Set(input.mileage),
            price: Set(input.price),
            engine_type: Set(input.engine_type),
            length: Set(input.dimensions.length),
            width: Set(input.dimensions.width),
            height: Set(input.dimensions.height),
            condition: Set(input.condition),
            features_json: Set(features_json),
            search_text: Set(haystack),
            description_local: Set(input.description_local),
            description_global: Set(input.description_global),
            status: Set(input.status.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(vehicle_id = model.id, "Vehicle created");
        Ok(VehicleResponse::assemble(model, category.slug, Vec::new()))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<VehicleResponse, AppError> {
        let model = find_vehicle(&self.db, id).await?;
        self.render(model).await
    }

    /// Rewrite every mutable field. `status: None` keeps the stored status.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: VehicleInput) -> Result<VehicleResponse, AppError> {
        validate_vehicle_input(&input)?;
        let features_json = encode_features(&input.features)?;
        let haystack = search_text(&input);

        let txn = self.db.begin().await?;
        let existing = find_vehicle(&txn, id).await?;
        let category = resolve_slug(&txn, &input.category).await?;

        let updated_at = std::cmp::max(Utc::now(), existing.updated_at);
        let mut active: vehicle::ActiveModel = existing.into();
        active.category_id = Set(category.id);
        active.make = Set(input.make.trim().to_string());
        active.model = Set(input.model.trim().to_string());
        active.year = Set(input.year);
        active.mileage = Set(input.mileage);
        active.price = Set(input.price);
        active.engine_type = Set(input.engine_type);
        active.length = Set(input.dimensions.length);
        active.width = Set(input.dimensions.width);
        active.height = Set(input.dimensions.height);
        active.condition = Set(input.condition);
        active.features_json = Set(features_json);
        active.search_text = Set(haystack);
        active.description_local = Set(input.description_local);
        active.description_global = Set(input.description_global);
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(updated_at);

        let model = active.update(&txn).await?;
        txn.commit().await?;

        let images = self.media.list_for_vehicle(id).await?;
        Ok(VehicleResponse::assemble(model, category.slug, images))
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: i32, status: VehicleStatus) -> Result<VehicleResponse, AppError> {
        let txn = self.db.begin().await?;
        let existing = find_vehicle(&txn, id).await?;

        let updated_at = std::cmp::max(Utc::now(), existing.updated_at);
        let mut active: vehicle::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(updated_at);
        let model = active.update(&txn).await?;
        txn.commit().await?;

        self.render(model).await
    }

    /// Delete a vehicle together with every image row and stored artifact.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let guard = self.media.lock_vehicle(id).await?;

        let txn = self.db.begin().await?;

        let images = self.media.purge_vehicle(&txn, id).await?;
        vehicle::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        drop(guard);
        self.media.forget_vehicle(id);

        tracing::info!(vehicle_id = id, images, "Vehicle deleted");
        Ok(())
    }

    /// Filtered, paginated listing, newest first.
    #[instrument(skip(self, query))]
    pub async fn list(&self, query: VehicleListQuery) -> Result<VehicleListResponse, AppError> {
        validate_list_query(&query)?;
        let (page, page_size) = resolve_paging(&query)?;
        let offset = page_offset(page, page_size)?;

        let mut select = vehicle::Entity::find();

        if let Some(ref slug) = query.category {
            match find_by_slug(&self.db, slug).await? {
                Some(c) => select = select.filter(vehicle::Column::CategoryId.eq(c.id)),
                None => {
                    return Ok(VehicleListResponse {
                        items: Vec::new(),
                        total_count: 0,
                        page,
                        page_size,
                    });
                }
            }
        }
        if let Some(min) = query.min_price {
            select = select.filter(vehicle::Column::Price.gte(min));
        }
        if let Some(max) = query.max_price {
            select = select.filter(vehicle::Column::Price.lte(max));
        }
        if let Some(min) = query.min_year {
            select = select.filter(vehicle::Column::Year.gte(min));
        }
        if let Some(max) = query.max_year {
            select = select.filter(vehicle::Column::Year.lte(max));
        }
        if let Some(status) = query.status {
            select = select.filter(vehicle::Column::Status.eq(status));
        }

        let total_count = select
            .clone()
            .paginate(&self.db, page_size)
            .num_items()
            .await?;

        let rows = select
            .order_by_desc(vehicle::Column::CreatedAt)
            .order_by_desc(vehicle::Column::Id)
            .offset(Some(offset))
            .limit(Some(page_size))
            .all(&self.db)
            .await?;

        Ok(VehicleListResponse {
            items: self.hydrate(rows).await?,
            total_count,
            page,
            page_size,
        })
    }

    /// Case-insensitive substring match over make, model, both category
    /// names and both descriptions. A blank query matches nothing.
    ///
    /// Lowercasing happens in Rust on both sides; SQL `LOWER` only folds
    /// ASCII on SQLite.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<VehicleResponse>, AppError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&needle));

        let category_ids: Vec<i32> = category::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|c| {
                c.name_local.to_lowercase().contains(&needle)
                    || c.name_global.to_lowercase().contains(&needle)
            })
            .map(|c| c.id)
            .collect();

        let rows = vehicle::Entity::find()
            .filter(
                Condition::any()
                    .add(
                        Expr::col(vehicle::Column::SearchText)
                            .like(LikeExpr::new(pattern).escape('\\')),
                    )
                    .add(vehicle::Column::CategoryId.is_in(category_ids)),
            )
            .order_by_desc(vehicle::Column::CreatedAt)
            .order_by_desc(vehicle::Column::Id)
            .all(&self.db)
            .await?;

        self.hydrate(rows).await
    }

    /// Available vehicles priced within 30% of `price`, nearest price first.
    /// Same-category matches come first; other categories backfill.
    #[instrument(skip(self))]
    pub async fn related_to(
        &self,
        vehicle_id: i32,
        category_id: i32,
        price: i64,
        limit: u64,
    ) -> Result<Vec<VehicleResponse>, AppError> {
        if price <= 0 {
            return Err(AppError::Validation("Price must be > 0".into()));
        }
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let (low, high) = price_band(price);
        let candidates = vehicle::Entity::find()
            .filter(vehicle::Column::Status.eq(VehicleStatus::Available))
            .filter(vehicle::Column::Id.ne(vehicle_id))
            .filter(vehicle::Column::Price.between(low, high));

        let mut picked = nearest(
            candidates
                .clone()
                .filter(vehicle::Column::CategoryId.eq(category_id))
                .all(&self.db)
                .await?,
            price,
            limit,
        );

        if picked.len() < limit {
            let backfill = candidates
                .filter(vehicle::Column::CategoryId.ne(category_id))
                .all(&self.db)
                .await?;
            let remaining = limit - picked.len();
            picked.extend(nearest(backfill, price, remaining));
        }

        self.hydrate(picked).await
    }

    /// [`related_to`](Self::related_to) for a stored vehicle.
    #[instrument(skip(self))]
    pub async fn related_for(&self, vehicle_id: i32, limit: u64) -> Result<Vec<VehicleResponse>, AppError> {
        let reference = find_vehicle(&self.db, vehicle_id).await?;
        self.related_to(reference.id, reference.category_id, reference.price, limit)
            .await
    }

    async fn render(&self, model: vehicle::Model) -> Result<VehicleResponse, AppError> {
        let slug = find_category(&self.db, model.category_id).await?.slug;
        let images = images_of(&self.db, model.id)
            .await?
            .into_iter()
            .map(ImageResponse::from)
            .collect();
        Ok(VehicleResponse::assemble(model, slug, images))
    }

    /// Attach category slugs and ordered images to a batch of rows, with one
    /// query per table.
    async fn hydrate(&self, rows: Vec<vehicle::Model>) -> Result<Vec<VehicleResponse>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let category_ids: Vec<i32> = rows.iter().map(|v| v.category_id).collect();
        let slugs: HashMap<i32, String> = category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.slug))
            .collect();

        let vehicle_ids: Vec<i32> = rows.iter().map(|v| v.id).collect();
        let mut images: HashMap<i32, Vec<ImageResponse>> = HashMap::new();
        for image in vehicle_image::Entity::find()
            .filter(vehicle_image::Column::VehicleId.is_in(vehicle_ids))
            .order_by_asc(vehicle_image::Column::DisplayOrder)
            .order_by_asc(vehicle_image::Column::Id)
            .all(&self.db)
            .await?
        {
            images
                .entry(image.vehicle_id)
                .or_default()
                .push(image.into());
        }

        Ok(rows
            .into_iter()
            .map(|v| {
                let slug = slugs.get(&v.category_id).cloned().unwrap_or_default();
                let imgs = images.remove(&v.id).unwrap_or_default();
                VehicleResponse::assemble(v, slug, imgs)
            })
            .collect())
    }
}

pub(crate) async fn find_vehicle<C: ConnectionTrait>(db: &C, id: i32) -> Result<vehicle::Model, AppError> {
    vehicle::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".into()))
}

/// Inclusive `[ceil(0.7 * price), floor(1.3 * price)]`.
pub fn price_band(price: i64) -> (i64, i64) {
    let p = i128::from(price);
    let low = (p * 7 + 9).div_euclid(10);
    let high = (p * 13).div_euclid(10);
    (clamp_i64(low), clamp_i64(high))
}

fn clamp_i64(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

/// Order by price distance, then id, and keep the first `limit`.
fn nearest(mut rows: Vec<vehicle::Model>, price: i64, limit: usize) -> Vec<vehicle::Model> {
    rows.sort_by_key(|v| (v.price.abs_diff(price), v.id));
    rows.truncate(limit);
    rows
}
