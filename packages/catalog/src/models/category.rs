use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{validate_slug, validate_text};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_ICON_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name_local: String,
    pub name_global: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct UpdateCategoryRequest {
    pub name_local: Option<String>,
    pub name_global: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryResponse {
    pub id: i32,
    pub name_local: String,
    pub name_global: String,
    pub slug: String,
    pub icon: Option<String>,
}

impl From<crate::entity::category::Model> for CategoryResponse {
    fn from(m: crate::entity::category::Model) -> Self {
        Self {
            id: m.id,
            name_local: m.name_local,
            name_global: m.name_global,
            slug: m.slug,
            icon: m.icon,
        }
    }
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_text(&req.name_local, "name_local", MAX_NAME_LENGTH)?;
    validate_text(&req.name_global, "name_global", MAX_NAME_LENGTH)?;
    validate_slug(&req.slug)
}

pub fn validate_update_category(req: &UpdateCategoryRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name_local {
        validate_text(name, "name_local", MAX_NAME_LENGTH)?;
    }
    if let Some(ref name) = req.name_global {
        validate_text(name, "name_global", MAX_NAME_LENGTH)?;
    }
    if let Some(ref slug) = req.slug {
        validate_slug(slug)?;
    }
    Ok(())
}

pub fn validate_icon(markup: &str) -> Result<(), AppError> {
    if markup.trim().is_empty() {
        return Err(AppError::Validation("Icon markup must not be empty".into()));
    }
    if markup.len() > MAX_ICON_BYTES {
        return Err(AppError::Validation(format!(
            "Icon markup must be at most {MAX_ICON_BYTES} bytes"
        )));
    }
    Ok(())
}
