use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name_local: String,  // native-language display name
    pub name_global: String, // Latin-script display name

    #[sea_orm(unique)]
    pub slug: String,

    /// Inline SVG markup, stored verbatim.
    #[sea_orm(column_type = "Text", nullable)]
    pub icon: Option<String>,

    #[sea_orm(has_many)]
    pub vehicles: HasMany<super::vehicle::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
