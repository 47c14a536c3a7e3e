use chrono::{DateTime, Datelike, Utc};
use common::VehicleStatus;
use serde::{Deserialize, Serialize};

use crate::entity::vehicle;
use crate::error::AppError;

use super::image::ImageResponse;
use super::shared::{validate_max_len, validate_text};

pub const MIN_YEAR: i32 = 1990;
pub const MAX_FEATURES: usize = 100;
pub const MAX_FEATURE_LENGTH: usize = 256;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Outer dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Full set of writable vehicle fields, used by both create and update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleInput {
    /// Category slug.
    pub category: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: i64,
    pub price: i64,
    #[serde(default)]
    pub engine_type: String,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description_local: String,
    #[serde(default)]
    pub description_global: String,
    /// Defaults to `available` on create and keeps the stored value on update.
    #[serde(default)]
    pub status: Option<VehicleStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleResponse {
    pub id: i32,
    pub category_id: i32,
    /// Category slug.
    pub category: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: i64,
    pub price: i64,
    pub engine_type: String,
    pub dimensions: Dimensions,
    pub condition: String,
    pub features: Vec<String>,
    pub description_local: String,
    pub description_global: String,
    pub status: VehicleStatus,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VehicleResponse {
    pub fn assemble(m: vehicle::Model, category_slug: String, images: Vec<ImageResponse>) -> Self {
        let features = decode_features(m.id, &m.features_json);
        Self {
            id: m.id,
            category_id: m.category_id,
            category: category_slug,
            make: m.make,
            model: m.model,
            year: m.year,
            mileage: m.mileage,
            price: m.price,
            engine_type: m.engine_type,
            dimensions: Dimensions {
                length: m.length,
                width: m.width,
                height: m.height,
            },
            condition: m.condition,
            features,
            description_local: m.description_local,
            description_global: m.description_global,
            status: m.status,
            images,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Conjunctive listing filters. Every present filter must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleListQuery {
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub status: Option<VehicleStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleListResponse {
    pub items: Vec<VehicleResponse>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Serialize the feature list for the `features_json` column.
pub fn encode_features(features: &[String]) -> Result<String, AppError> {
    serde_json::to_string(features)
        .map_err(|e| AppError::Internal(format!("Failed to encode features: {e}")))
}

/// Parse a stored feature list. Malformed data degrades to an empty list.
pub fn decode_features(vehicle_id: i32, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(features) => features,
        Err(e) => {
            tracing::warn!(vehicle_id, error = %e, "Malformed features column, returning empty list");
            Vec::new()
        }
    }
}

pub fn validate_vehicle_input(req: &VehicleInput) -> Result<(), AppError> {
    if req.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".into()));
    }
    validate_text(&req.make, "make", 128)?;
    validate_text(&req.model, "model", 128)?;

    let max_year = Utc::now().year() + 1;
    if !(MIN_YEAR..=max_year).contains(&req.year) {
        return Err(AppError::Validation(format!(
            "Year must be {MIN_YEAR}-{max_year}"
        )));
    }
    if req.mileage < 0 {
        return Err(AppError::Validation("Mileage must be >= 0".into()));
    }
    if req.price <= 0 {
        return Err(AppError::Validation("Price must be > 0".into()));
    }

    validate_max_len(&req.engine_type, "engine_type", 64)?;
    validate_max_len(&req.condition, "condition", 64)?;

    let d = req.dimensions;
    if [d.length, d.width, d.height]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        return Err(AppError::Validation(
            "Dimensions must be finite and >= 0".into(),
        ));
    }

    if req.features.len() > MAX_FEATURES {
        return Err(AppError::Validation(format!(
            "At most {MAX_FEATURES} features are allowed"
        )));
    }
    if req
        .features
        .iter()
        .any(|f| f.trim().is_empty() || f.chars().count() > MAX_FEATURE_LENGTH)
    {
        return Err(AppError::Validation(format!(
            "Each feature must be 1-{MAX_FEATURE_LENGTH} characters"
        )));
    }

    validate_max_len(&req.description_local, "description_local", MAX_DESCRIPTION_LENGTH)?;
    validate_max_len(&req.description_global, "description_global", MAX_DESCRIPTION_LENGTH)?;
    Ok(())
}

/// Lowercased make, model and descriptions, joined with a unit separator so a
/// match cannot span two fields.
pub fn search_text(input: &VehicleInput) -> String {
    [
        input.make.trim(),
        input.model.trim(),
        input.description_local.as_str(),
        input.description_global.as_str(),
    ]
    .join("\u{1f}")
    .to_lowercase()
}

/// Resolve and validate paging parameters into `(page, page_size)`.
pub fn resolve_paging(query: &VehicleListQuery) -> Result<(u64, u64), AppError> {
    let page = query.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::Validation("page must be >= 1".into()));
    }
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size < 1 {
        return Err(AppError::Validation("page_size must be >= 1".into()));
    }
    Ok((page, page_size.min(MAX_PAGE_SIZE)))
}

/// Row offset of `page`. Pages past what a database offset can express are a
/// validation error.
pub fn page_offset(page: u64, page_size: u64) -> Result<u64, AppError> {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::Validation("page is out of range".into()))
}

pub fn validate_list_query(query: &VehicleListQuery) -> Result<(), AppError> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price)
        && min > max
    {
        return Err(AppError::Validation(
            "min_price must not exceed max_price".into(),
        ));
    }
    if let (Some(min), Some(max)) = (query.min_year, query.max_year)
        && min > max
    {
        return Err(AppError::Validation(
            "min_year must not exceed max_year".into(),
        ));
    }
    Ok(())
}
