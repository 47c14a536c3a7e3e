use ::common::VehicleStatus;
use catalog::error::AppError;
use catalog::models::vehicle::{VehicleInput, VehicleListQuery};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::common::{TestApp, jpeg, vehicle_input};

async fn seeded() -> TestApp {
    let app = TestApp::spawn().await;
    app.create_category("ダンプ", "Dump", "dump").await;
    app.create_category("クレーン", "Crane", "crane").await;
    app
}

mod vehicle_crud {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips_every_field() {
        let app = seeded().await;
        let input = VehicleInput {
            features: vec![" spaced ".into(), "ABS".into(), "ABS".into(), "荷台".into()],
            ..vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000)
        };

        let created = app.create_vehicle(input.clone()).await;
        let fetched = app.vehicles().get(created.id).await.unwrap();

        assert_eq!(fetched.category, "dump");
        assert_eq!(fetched.make, "Isuzu");
        assert_eq!(fetched.model, "Forward");
        assert_eq!(fetched.year, 2020);
        assert_eq!(fetched.mileage, 50_000);
        assert_eq!(fetched.price, 5_000_000);
        assert_eq!(fetched.engine_type, input.engine_type);
        assert_eq!(fetched.condition, input.condition);
        assert_eq!(fetched.features, input.features);
        assert_eq!(fetched.description_local, "低走行");
        assert_eq!(fetched.description_global, "Low mileage");
        assert_eq!(fetched.status, VehicleStatus::Available);
        assert!((fetched.dimensions.length - input.dimensions.length).abs() < 1e-9);
        assert!((fetched.dimensions.width - input.dimensions.width).abs() < 1e-9);
        assert!((fetched.dimensions.height - input.dimensions.height).abs() < 1e-9);
        assert!(fetched.images.is_empty());
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn unknown_category_is_invalid_category() {
        let app = seeded().await;
        let err = app
            .vehicles()
            .create(vehicle_input("bus", "Hino", "Blue Ribbon", 2018, 9_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCategory(ref slug) if slug == "bus"));
    }

    #[tokio::test]
    async fn out_of_range_fields_are_rejected() {
        let app = seeded().await;
        let cases = [
            vehicle_input("dump", "Isuzu", "Forward", 1989, 1),
            vehicle_input("dump", "Isuzu", "Forward", 2020, 0),
            VehicleInput {
                mileage: -5,
                ..vehicle_input("dump", "Isuzu", "Forward", 2020, 100)
            },
            vehicle_input("dump", " ", "Forward", 2020, 100),
        ];
        for input in cases {
            let err = app.vehicles().create(input).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        }
        let page = app.vehicles().list(VehicleListQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn update_rewrites_fields_and_advances_timestamp() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        let updated = app
            .vehicles()
            .update(
                created.id,
                VehicleInput {
                    mileage: 61_000,
                    features: vec!["Crane 2.9t".into()],
                    ..vehicle_input("crane", "Isuzu", "Forward Crane", 2021, 6_200_000)
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category, "crane");

        let fetched = app.vehicles().get(created.id).await.unwrap();
        assert_eq!(fetched.model, "Forward Crane");
        assert_eq!(fetched.year, 2021);
        assert_eq!(fetched.mileage, 61_000);
        assert_eq!(fetched.price, 6_200_000);
        assert_eq!(fetched.features, vec!["Crane 2.9t".to_string()]);
        assert_eq!(fetched.created_at, created.created_at);
        assert!(fetched.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_without_status_keeps_stored_status() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let reserved = app
            .vehicles()
            .set_status(created.id, VehicleStatus::Reserved)
            .await
            .unwrap();
        assert!(reserved.updated_at >= created.updated_at);
        assert_eq!(reserved.created_at, created.created_at);

        let updated = app
            .vehicles()
            .update(
                created.id,
                vehicle_input("dump", "Isuzu", "Forward", 2020, 4_800_000),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Reserved);
    }

    #[tokio::test]
    async fn update_of_missing_vehicle_is_not_found() {
        let app = seeded().await;
        let err = app
            .vehicles()
            .update(404, vehicle_input("dump", "Isuzu", "Forward", 2020, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_stored_features_read_as_empty() {
        use catalog::entity::vehicle;

        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        let row = vehicle::Entity::find_by_id(created.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: vehicle::ActiveModel = row.into();
        active.features_json = Set("{not json".into());
        active.update(&app.db).await.unwrap();

        let fetched = app.vehicles().get(created.id).await.unwrap();
        assert!(fetched.features.is_empty());
        assert_eq!(fetched.make, "Isuzu");
    }
}

mod vehicle_deletion {
    use super::*;

    #[tokio::test]
    async fn image_rows_follow_vehicle_row_delete() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        for _ in 0..2 {
            app.media()
                .upload(created.id, jpeg(32, 24), "image/jpeg")
                .await
                .unwrap();
        }

        catalog::entity::vehicle::Entity::delete_by_id(created.id)
            .exec(&app.db)
            .await
            .unwrap();

        let left = catalog::entity::vehicle_image::Entity::find()
            .all(&app.db)
            .await
            .unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn deleted_vehicle_disappears_everywhere() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.media()
            .upload(created.id, jpeg(640, 480), "image/jpeg")
            .await
            .unwrap();

        app.vehicles().delete(created.id).await.unwrap();

        assert!(matches!(
            app.vehicles().get(created.id).await,
            Err(AppError::NotFound(_))
        ));
        let page = app.vehicles().list(VehicleListQuery::default()).await.unwrap();
        assert!(page.items.iter().all(|v| v.id != created.id));
        assert!(app.media().list_for_vehicle(created.id).await.unwrap().is_empty());
        assert_eq!(app.artifact_count(created.id), 0);
    }

    #[tokio::test]
    async fn cascade_removes_every_row_and_artifact() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let other = app
            .create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2019, 4_000_000))
            .await;

        const N: usize = 5;
        for _ in 0..N {
            app.media()
                .upload(created.id, jpeg(64, 48), "image/jpeg")
                .await
                .unwrap();
        }
        app.media()
            .upload(other.id, jpeg(64, 48), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(app.artifact_count(created.id), 2 * N);

        app.vehicles().delete(created.id).await.unwrap();

        let remaining = catalog::entity::vehicle_image::Entity::find()
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].vehicle_id, other.id);
        assert_eq!(app.artifact_count(created.id), 0);
        assert_eq!(app.artifact_count(other.id), 2);
    }

    #[tokio::test]
    async fn deleting_missing_vehicle_is_not_found() {
        let app = seeded().await;
        assert!(matches!(
            app.vehicles().delete(12).await,
            Err(AppError::NotFound(_))
        ));
    }
}

mod vehicle_listing {
    use super::*;

    #[tokio::test]
    async fn page_past_offset_range_is_rejected() {
        let app = seeded().await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        let err = app
            .vehicles()
            .list(VehicleListQuery {
                page: Some(u64::MAX),
                page_size: Some(100),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let far = app
            .vehicles()
            .list(VehicleListQuery {
                page: Some(1_000_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(far.items.is_empty());
        assert_eq!(far.total_count, 1);
    }

    #[tokio::test]
    async fn category_filter_returns_only_that_category() {
        let app = seeded().await;
        let dump = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.create_vehicle(vehicle_input("crane", "Tadano", "Rough Terrain", 2015, 12_000_000))
            .await;

        let page = app
            .vehicles()
            .list(VehicleListQuery {
                category: Some("dump".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, dump.id);
        assert!(page.items.iter().all(|v| v.category == "dump"));
    }

    #[tokio::test]
    async fn unknown_category_filter_yields_empty_page() {
        let app = seeded().await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        let page = app
            .vehicles()
            .list(VehicleListQuery {
                category: Some("bus".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn combined_filters_are_conjunctive() {
        let app = seeded().await;
        let target = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        // Each of these violates exactly one filter.
        app.create_vehicle(vehicle_input("crane", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 9_000_000))
            .await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2012, 5_000_000))
            .await;

        let page = app
            .vehicles()
            .list(VehicleListQuery {
                category: Some("dump".into()),
                min_price: Some(4_000_000),
                max_price: Some(6_000_000),
                min_year: Some(2018),
                max_year: Some(2022),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i32> = page.items.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![target.id]);
        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn status_filter() {
        let app = seeded().await;
        let sold = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2020, 5_000_000))
            .await;
        app.vehicles()
            .set_status(sold.id, VehicleStatus::Sold)
            .await
            .unwrap();

        let page = app
            .vehicles()
            .list(VehicleListQuery {
                status: Some(VehicleStatus::Sold),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, sold.id);
    }

    #[tokio::test]
    async fn pages_are_newest_first() {
        let app = seeded().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let v = app
                .create_vehicle(vehicle_input("dump", "Isuzu", &format!("Forward {i}"), 2020, 1_000_000))
                .await;
            ids.push(v.id);
        }
        ids.reverse();

        let first = app
            .vehicles()
            .list(VehicleListQuery {
                page: Some(1),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let second = app
            .vehicles()
            .list(VehicleListQuery {
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.total_count, 5);
        assert_eq!(first.page_size, 2);
        let seen: Vec<i32> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|v| v.id)
            .collect();
        assert_eq!(seen, ids[..4]);
    }

    #[tokio::test]
    async fn listed_items_carry_their_images() {
        let app = seeded().await;
        let v = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.media().upload(v.id, jpeg(64, 48), "image/jpeg").await.unwrap();
        app.media().upload(v.id, jpeg(64, 48), "image/jpeg").await.unwrap();

        let page = app.vehicles().list(VehicleListQuery::default()).await.unwrap();
        let orders: Vec<i32> = page.items[0].images.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[tokio::test]
    async fn invalid_paging_and_ranges_are_rejected() {
        let app = seeded().await;
        for query in [
            VehicleListQuery {
                page: Some(0),
                ..Default::default()
            },
            VehicleListQuery {
                page_size: Some(0),
                ..Default::default()
            },
            VehicleListQuery {
                min_price: Some(10),
                max_price: Some(1),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                app.vehicles().list(query).await,
                Err(AppError::Validation(_))
            ));
        }
    }
}

mod vehicle_search {
    use super::*;

    #[tokio::test]
    async fn non_ascii_text_matches_in_any_case() {
        let app = seeded().await;
        let skoda = app
            .create_vehicle(VehicleInput {
                description_global: "ÜBERFÜHRUNG included".into(),
                ..vehicle_input("dump", "Škoda", "Élan", 2018, 3_000_000)
            })
            .await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        for query in ["Élan", "élan", "ÉLAN", "škoda", "ŠKODA", "überführung"] {
            let hits = app.vehicles().search(query).await.unwrap();
            let ids: Vec<i32> = hits.iter().map(|v| v.id).collect();
            assert_eq!(ids, vec![skoda.id], "query {query:?}");
        }
    }

    #[tokio::test]
    async fn updated_text_is_searchable() {
        let app = seeded().await;
        let created = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;

        app.vehicles()
            .update(created.id, vehicle_input("dump", "Isuzu", "Gíga", 2020, 5_000_000))
            .await
            .unwrap();

        assert!(app.vehicles().search("forward").await.unwrap().is_empty());
        assert_eq!(app.vehicles().search("GÍGA").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn matches_any_text_field_case_insensitively() {
        let app = seeded().await;
        let by_make = app
            .create_vehicle(vehicle_input("crane", "Isuzu", "Elf", 2019, 3_000_000))
            .await;
        let by_model = app
            .create_vehicle(vehicle_input("crane", "Hino", "Forward-ish", 2019, 3_000_000))
            .await;
        let by_category = app
            .create_vehicle(vehicle_input("dump", "Mitsubishi", "Canter", 2019, 3_000_000))
            .await;
        let by_description = app
            .create_vehicle(VehicleInput {
                description_global: "Ex-FORWARD fleet unit".into(),
                ..vehicle_input("crane", "UD", "Condor", 2019, 3_000_000)
            })
            .await;
        let unrelated = app
            .create_vehicle(vehicle_input("crane", "Tadano", "Rough Terrain", 2019, 3_000_000))
            .await;

        let hits: Vec<i32> = app
            .vehicles()
            .search("forward")
            .await
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert!(hits.contains(&by_model.id));
        assert!(hits.contains(&by_description.id));
        assert!(!hits.contains(&unrelated.id));

        let hits = app.vehicles().search("ISUZU").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, by_make.id);

        let hits = app.vehicles().search("ダンプ").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, by_category.id);

        let hits = app.vehicles().search("dump").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, by_category.id);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let app = seeded().await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        assert!(app.vehicles().search("").await.unwrap().is_empty());
        assert!(app.vehicles().search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wildcards_are_literal() {
        let app = seeded().await;
        app.create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let percent = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "100% Giga", 2020, 5_000_000))
            .await;

        assert!(app.vehicles().search("_").await.unwrap().is_empty());
        let hits = app.vehicles().search("%").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, percent.id);
    }
}

mod recommendations {
    use super::*;

    #[tokio::test]
    async fn nearest_price_first_within_category() {
        let app = seeded().await;
        let reference = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let far = app
            .create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2020, 6_400_000))
            .await;
        let near = app
            .create_vehicle(vehicle_input("dump", "UD", "Condor", 2020, 5_100_000))
            .await;
        let mid = app
            .create_vehicle(vehicle_input("dump", "Fuso", "Fighter", 2020, 4_500_000))
            .await;
        // Outside the band.
        app.create_vehicle(vehicle_input("dump", "Fuso", "Super Great", 2020, 9_000_000))
            .await;

        let related = app.vehicles().related_for(reference.id, 4).await.unwrap();
        let ids: Vec<i32> = related.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![near.id, mid.id, far.id]);
    }

    #[tokio::test]
    async fn backfills_from_other_categories() {
        let app = seeded().await;
        let reference = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let same = app
            .create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2020, 6_000_000))
            .await;
        let other_near = app
            .create_vehicle(vehicle_input("crane", "Tadano", "TM", 2020, 5_050_000))
            .await;
        let other_far = app
            .create_vehicle(vehicle_input("crane", "Unic", "URV", 2020, 3_600_000))
            .await;

        let related = app.vehicles().related_for(reference.id, 3).await.unwrap();
        let ids: Vec<i32> = related.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![same.id, other_near.id, other_far.id]);
    }

    #[tokio::test]
    async fn sold_reserved_and_self_are_excluded() {
        let app = seeded().await;
        let reference = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        let sold = app
            .create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2020, 5_000_000))
            .await;
        let reserved = app
            .create_vehicle(vehicle_input("dump", "UD", "Condor", 2020, 5_000_000))
            .await;
        let available = app
            .create_vehicle(vehicle_input("crane", "Tadano", "TM", 2020, 5_000_000))
            .await;
        app.vehicles()
            .set_status(sold.id, VehicleStatus::Sold)
            .await
            .unwrap();
        app.vehicles()
            .set_status(reserved.id, VehicleStatus::Reserved)
            .await
            .unwrap();

        let related = app.vehicles().related_for(reference.id, 4).await.unwrap();
        let ids: Vec<i32> = related.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![available.id]);
        assert!(related.iter().all(|v| v.status.is_offered()));
    }

    #[tokio::test]
    async fn zero_limit_and_bad_price() {
        let app = seeded().await;
        let reference = app
            .create_vehicle(vehicle_input("dump", "Isuzu", "Forward", 2020, 5_000_000))
            .await;
        app.create_vehicle(vehicle_input("dump", "Hino", "Ranger", 2020, 5_000_000))
            .await;

        assert!(app
            .vehicles()
            .related_to(reference.id, reference.category_id, 5_000_000, 0)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            app.vehicles()
                .related_to(reference.id, reference.category_id, 0, 4)
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            app.vehicles().related_for(999, 4).await,
            Err(AppError::NotFound(_))
        ));
    }
}
