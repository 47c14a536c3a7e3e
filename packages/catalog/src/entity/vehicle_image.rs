use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicle_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub vehicle_id: i32,
    #[sea_orm(belongs_to, from = "vehicle_id", to = "id", on_delete = "Cascade")]
    pub vehicle: HasOne<super::vehicle::Entity>,

    /// Generated artifact name; storage paths are derived from it.
    pub filename: String,
    pub url: String,
    pub thumbnail_url: String,

    /// Zero-based display rank, contiguous within one vehicle.
    pub display_order: i32,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
