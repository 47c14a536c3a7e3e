use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::vehicle_image;
use crate::error::AppError;

use super::shared::validate_reorder_ids;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResponse {
    pub id: i32,
    pub vehicle_id: i32,
    pub filename: String,
    pub url: String,
    pub thumbnail_url: String,
    pub order: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl From<vehicle_image::Model> for ImageResponse {
    fn from(m: vehicle_image::Model) -> Self {
        Self {
            id: m.id,
            vehicle_id: m.vehicle_id,
            filename: m.filename,
            url: m.url,
            thumbnail_url: m.thumbnail_url,
            order: m.display_order,
            uploaded_at: m.uploaded_at,
        }
    }
}

/// Full ordering of a vehicle's images, first entry displayed first.
#[derive(Debug, Clone, Deserialize)]
pub struct SetImageOrderRequest {
    pub image_ids: Vec<i32>,
}

pub fn validate_set_image_order(req: &SetImageOrderRequest) -> Result<(), AppError> {
    validate_reorder_ids(&req.image_ids, "image_id")
}

/// Storage paths of the two derivatives of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePaths {
    pub full: String,
    pub thumbnail: String,
}

impl ImagePaths {
    pub fn new(vehicle_id: i32, filename: &str) -> Self {
        Self {
            full: format!("vehicles/{vehicle_id}/{filename}"),
            thumbnail: format!("vehicles/{vehicle_id}/thumbs/{filename}"),
        }
    }

    pub fn of(m: &vehicle_image::Model) -> Self {
        Self::new(m.vehicle_id, &m.filename)
    }
}
