use common::VehicleStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicle")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub category_id: i32,
    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: HasOne<super::category::Entity>,

    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: i64, // in km
    pub price: i64,   // in yen, tax included
    pub engine_type: String,

    // Dimensions in millimetres.
    pub length: f64,
    pub width: f64,
    pub height: f64,

    pub condition: String,

    /// Ordered feature list stored as a JSON array of strings.
    #[sea_orm(column_type = "Text")]
    pub features_json: String,

    #[sea_orm(column_type = "Text")]
    pub description_local: String,
    #[sea_orm(column_type = "Text")]
    pub description_global: String,

    /// Lowercased make, model and descriptions, matched by search.
    #[sea_orm(column_type = "Text")]
    pub search_text: String,

    pub status: VehicleStatus,

    #[sea_orm(has_many)]
    pub images: HasMany<super::vehicle_image::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
