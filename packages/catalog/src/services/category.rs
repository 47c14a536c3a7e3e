use sea_orm::*;
use tracing::instrument;

use crate::entity::{category, vehicle};
use crate::error::AppError;
use crate::models::category::*;

/// Vehicle categories: bilingual names, a unique slug and an optional icon.
#[derive(Clone)]
pub struct CategoryRegistry {
    db: DatabaseConnection,
}

impl CategoryRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryResponse>, AppError> {
        let rows = category::Entity::find()
            .order_by_asc(category::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CategoryResponse, AppError> {
        Ok(find_category(&self.db, id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryResponse, AppError> {
        find_by_slug(&self.db, slug)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound("Category not found".into()))
    }

    /// Resolve a slug for a vehicle write. Unknown slugs are `InvalidCategory`.
    pub async fn resolve(&self, slug: &str) -> Result<category::Model, AppError> {
        resolve_slug(&self.db, slug).await
    }

    #[instrument(skip(self, req), fields(slug = %req.slug))]
    pub async fn create(&self, req: CreateCategoryRequest) -> Result<CategoryResponse, AppError> {
        validate_create_category(&req)?;

        let txn = self.db.begin().await?;

        if find_by_slug(&txn, &req.slug).await?.is_some() {
            return Err(slug_taken(&req.slug));
        }

        let model = category::ActiveModel {
            name_local: Set(req.name_local.trim().to_string()),
            name_global: Set(req.name_global.trim().to_string()),
            slug: Set(req.slug.clone()),
            icon: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, &req.slug))?;

        txn.commit().await?;
        tracing::info!(category_id = model.id, "Category created");
        Ok(model.into())
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        id: i32,
        req: UpdateCategoryRequest,
    ) -> Result<CategoryResponse, AppError> {
        validate_update_category(&req)?;

        if req == UpdateCategoryRequest::default() {
            return self.get(id).await;
        }

        let txn = self.db.begin().await?;

        let existing = find_category(&txn, id).await?;
        if let Some(ref slug) = req.slug
            && *slug != existing.slug
            && find_by_slug(&txn, slug).await?.is_some()
        {
            return Err(slug_taken(slug));
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(ref name) = req.name_local {
            active.name_local = Set(name.trim().to_string());
        }
        if let Some(ref name) = req.name_global {
            active.name_global = Set(name.trim().to_string());
        }
        if let Some(ref slug) = req.slug {
            active.slug = Set(slug.clone());
        }

        let new_slug = req.slug.as_deref().unwrap_or_default();
        let model = active
            .update(&txn)
            .await
            .map_err(|e| conflict_on_unique(e, new_slug))?;
        txn.commit().await?;

        Ok(model.into())
    }

    /// Delete a category. Blocked while any vehicle references it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        let txn = self.db.begin().await?;

        find_category(&txn, id).await?;

        let in_use = vehicle::Entity::find()
            .filter(vehicle::Column::CategoryId.eq(id))
            .count(&txn)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Category is used by {in_use} vehicle(s)"
            )));
        }

        category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    /// Replace the icon markup. Sanitizing it is left to the renderer.
    #[instrument(skip(self, markup), fields(len = markup.len()))]
    pub async fn set_icon(&self, id: i32, markup: &str) -> Result<CategoryResponse, AppError> {
        validate_icon(markup)?;
        self.write_icon(id, Some(markup.to_string())).await
    }

    #[instrument(skip(self))]
    pub async fn clear_icon(&self, id: i32) -> Result<CategoryResponse, AppError> {
        self.write_icon(id, None).await
    }

    async fn write_icon(&self, id: i32, icon: Option<String>) -> Result<CategoryResponse, AppError> {
        let txn = self.db.begin().await?;
        let existing = find_category(&txn, id).await?;
        let mut active: category::ActiveModel = existing.into();
        active.icon = Set(icon);
        let model = active.update(&txn).await?;
        txn.commit().await?;
        Ok(model.into())
    }
}

pub(crate) async fn find_category<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<category::Model, AppError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

pub(crate) async fn find_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<Option<category::Model>, AppError> {
    Ok(category::Entity::find()
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await?)
}

pub(crate) async fn resolve_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<category::Model, AppError> {
    find_by_slug(db, slug)
        .await?
        .ok_or_else(|| AppError::InvalidCategory(slug.to_string()))
}

fn slug_taken(slug: &str) -> AppError {
    AppError::Conflict(format!("Slug '{slug}' is already in use"))
}

/// A concurrent insert can pass the pre-check and still trip the unique index.
fn conflict_on_unique(err: DbErr, slug: &str) -> AppError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return slug_taken(slug);
    }
    err.into()
}
