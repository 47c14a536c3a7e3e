use sea_orm::sea_query::{Index, IntoIndexColumn, IntoTableRef, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{vehicle, vehicle_image};

/// Ensure the secondary indexes used by listing and image ordering exist.
///
/// SeaORM's schema-sync doesn't create composite non-unique indexes, so they
/// are created here on startup. The generated DDL is also valid for SQLite.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Category filter + newest-first ordering
    create_index(
        db,
        "idx_vehicle_category_created",
        vehicle::Entity,
        [vehicle::Column::CategoryId, vehicle::Column::CreatedAt],
    )
    .await;

    // Recommendation candidates: available vehicles in a price band
    create_index(
        db,
        "idx_vehicle_status_price",
        vehicle::Entity,
        [vehicle::Column::Status, vehicle::Column::Price],
    )
    .await;

    create_index(
        db,
        "idx_vehicle_image_vehicle_order",
        vehicle_image::Entity,
        [
            vehicle_image::Column::VehicleId,
            vehicle_image::Column::DisplayOrder,
        ],
    )
    .await;

    Ok(())
}

async fn create_index<T, C>(db: &DatabaseConnection, name: &str, table: T, cols: [C; 2])
where
    T: IntoTableRef,
    C: IntoIndexColumn,
{
    let mut stmt = Index::create();
    stmt.if_not_exists().name(name).table(table);
    for col in cols {
        stmt.col(col);
    }
    let sql = stmt.to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}
