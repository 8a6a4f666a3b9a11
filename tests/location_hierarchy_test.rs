mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, IntoActiveModel};
use uuid::Uuid;

use common::{admin, staff, TestApp};
use wms_core::{
    auth::SYSTEM_USER_ID,
    entities::location::{self, LocationType},
    errors::ServiceError,
    services::{
        ledger::OccupancyStatus,
        locations::{CapacityRequest, CreateLocationRequest, LocationFilter, OccupancyFilter},
    },
    PageRequest,
};

fn request(
    zone: &wms_core::entities::zone::Model,
    code: &str,
    location_type: LocationType,
    parent_id: Option<Uuid>,
) -> CreateLocationRequest {
    CreateLocationRequest {
        warehouse_id: zone.warehouse_id,
        zone_id: zone.id,
        code: code.to_string(),
        location_type,
        parent_id,
        max_weight_kg: None,
        max_volume_m3: None,
        is_picking_face: false,
        is_staging: false,
    }
}

#[tokio::test]
async fn bin_ancestry_is_bin_rack_aisle_zone() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let ancestry = app
        .services()
        .locations
        .ancestry(layout.bin_large.id)
        .await
        .expect("ancestry");

    assert_eq!(ancestry.codes(), vec!["B-01", "R-01", "A-01"]);
    assert_eq!(ancestry.zone.id, layout.storage_zone.id);
    assert_eq!(
        ancestry.ancestor_of_type(LocationType::Rack).map(|l| l.id),
        Some(layout.rack.id)
    );
}

/// Writes a bin row directly, bypassing the service's parent checks.
async fn raw_bin(
    app: &TestApp,
    zone: &wms_core::entities::zone::Model,
    code: &str,
    parent_id: Option<Uuid>,
) -> location::Model {
    location::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(zone.warehouse_id),
        zone_id: Set(zone.id),
        code: Set(code.to_string()),
        location_type: Set(LocationType::Bin),
        parent_id: Set(parent_id),
        max_weight_kg: Set(None),
        max_volume_m3: Set(None),
        is_picking_face: Set(false),
        is_staging: Set(false),
        active: Set(true),
        created_by: Set(SYSTEM_USER_ID),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        deactivated_at: Set(None),
    }
    .insert(app.db())
    .await
    .expect("insert location")
}

#[tokio::test]
async fn ancestry_stops_on_parent_cycles() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let first = raw_bin(&app, &layout.storage_zone, "X-01", None).await;
    let second = raw_bin(&app, &layout.storage_zone, "X-02", Some(first.id)).await;
    let mut looped = first.into_active_model();
    looped.parent_id = Set(Some(second.id));
    let first = looped.update(app.db()).await.expect("close the loop");

    assert_matches!(
        app.services().locations.ancestry(first.id).await,
        Err(ServiceError::HierarchyViolation(_))
    );
}

#[tokio::test]
async fn ancestry_rejects_chains_deeper_than_three_levels() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let mut parent = None;
    let mut deepest = None;
    for code in ["Y-01", "Y-02", "Y-03", "Y-04"] {
        let bin = raw_bin(&app, &layout.storage_zone, code, parent).await;
        parent = Some(bin.id);
        deepest = Some(bin.id);
    }

    assert_matches!(
        app.services()
            .locations
            .ancestry(deepest.expect("chain"))
            .await,
        Err(ServiceError::HierarchyViolation(_))
    );
}

#[tokio::test]
async fn rack_under_aisle_of_another_zone_is_rejected() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let err = app
        .services()
        .locations
        .create_location(
            request(&layout.receiving_zone, "R-X", LocationType::Rack, Some(layout.aisle.id)),
            &admin(),
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::HierarchyViolation(_));
}

#[tokio::test]
async fn wrong_parent_types_are_rejected() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let locations = &app.services().locations;
    let zone = &layout.storage_zone;

    let bin_under_aisle = locations
        .create_location(request(zone, "B-X", LocationType::Bin, Some(layout.aisle.id)), &admin())
        .await;
    assert_matches!(bin_under_aisle, Err(ServiceError::HierarchyViolation(_)));

    let aisle_with_parent = locations
        .create_location(request(zone, "A-X", LocationType::Aisle, Some(layout.rack.id)), &admin())
        .await;
    assert_matches!(aisle_with_parent, Err(ServiceError::HierarchyViolation(_)));

    let orphan_rack = locations
        .create_location(request(zone, "R-X", LocationType::Rack, None), &admin())
        .await;
    assert_matches!(orphan_rack, Err(ServiceError::HierarchyViolation(_)));

    let unknown_parent = locations
        .create_location(request(zone, "R-Y", LocationType::Rack, Some(Uuid::new_v4())), &admin())
        .await;
    assert_matches!(unknown_parent, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn codes_are_unique_within_a_zone() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let duplicate = app
        .services()
        .locations
        .create_location(
            request(&layout.storage_zone, "A-01", LocationType::Aisle, None),
            &admin(),
        )
        .await;
    assert_matches!(duplicate, Err(ServiceError::ValidationError(_)));

    // The same code is free in another zone.
    app.services()
        .locations
        .create_location(
            request(&layout.receiving_zone, "A-01", LocationType::Aisle, None),
            &admin(),
        )
        .await
        .expect("same code in another zone");
}

#[tokio::test]
async fn capacity_and_flags_only_apply_to_bins() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let mut staging_rack = request(&layout.storage_zone, "R-S", LocationType::Rack, Some(layout.aisle.id));
    staging_rack.is_staging = true;
    let err = app
        .services()
        .locations
        .create_location(staging_rack, &admin())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn staff_cannot_manage_locations() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let err = app
        .services()
        .locations
        .create_location(request(&layout.storage_zone, "A-02", LocationType::Aisle, None), &staff())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn deactivation_requires_empty_leaf() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let locations = &app.services().locations;

    let rack = locations.deactivate_location(layout.rack.id, &admin()).await;
    assert_matches!(rack, Err(ServiceError::PreconditionFailed(_)));

    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_small.id, 5)
        .await;
    let holding = locations.deactivate_location(layout.bin_small.id, &admin()).await;
    assert_matches!(holding, Err(ServiceError::PreconditionFailed(_)));

    let deactivated = locations
        .deactivate_location(layout.bin_large.id, &admin())
        .await
        .expect("empty bin deactivates");
    assert!(!deactivated.active);
    assert!(deactivated.deactivated_at.is_some());

    // One way: a deactivated location cannot be touched again.
    let again = locations.deactivate_location(layout.bin_large.id, &admin()).await;
    assert_matches!(again, Err(ServiceError::PreconditionFailed(_)));

    // Nothing new may hang from an inactive parent.
    let spare_rack = app
        .create_location(
            &layout.storage_zone,
            "R-02",
            LocationType::Rack,
            Some(layout.aisle.id),
            None,
            false,
        )
        .await;
    locations
        .deactivate_location(spare_rack.id, &admin())
        .await
        .expect("childless rack deactivates");
    let under_inactive = locations
        .create_location(
            request(&layout.storage_zone, "B-03", LocationType::Bin, Some(spare_rack.id)),
            &admin(),
        )
        .await;
    assert_matches!(under_inactive, Err(ServiceError::HierarchyViolation(_)));
}

#[tokio::test]
async fn capacity_cannot_drop_below_occupancy() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 60)
        .await;

    let too_small = app
        .services()
        .locations
        .configure_capacity(
            layout.bin_large.id,
            CapacityRequest {
                max_weight_kg: Some(Decimal::from(50)),
                max_volume_m3: None,
            },
            &admin(),
        )
        .await;
    assert_matches!(too_small, Err(ServiceError::CapacityViolation(_)));

    let resized = app
        .services()
        .locations
        .configure_capacity(
            layout.bin_large.id,
            CapacityRequest {
                max_weight_kg: Some(Decimal::from(60)),
                max_volume_m3: None,
            },
            &admin(),
        )
        .await
        .expect("capacity equal to occupancy is allowed");
    assert_eq!(resized.max_weight_kg, Some(Decimal::from(60)));

    let negative = app
        .services()
        .locations
        .configure_capacity(
            layout.bin_small.id,
            CapacityRequest {
                max_weight_kg: Some(Decimal::from(-1)),
                max_volume_m3: None,
            },
            &admin(),
        )
        .await;
    assert_matches!(negative, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn occupancy_status_follows_fill_level() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let locations = &app.services().locations;

    let empty = locations.view_bin_occupancy(layout.bin_large.id).await.unwrap();
    assert_eq!(empty.status, OccupancyStatus::Empty);
    assert!(empty.lines.is_empty());

    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 50)
        .await;
    let partial = locations.view_bin_occupancy(layout.bin_large.id).await.unwrap();
    assert_eq!(partial.status, OccupancyStatus::Partial);
    assert_eq!(partial.occupied, 50);
    assert_eq!(partial.lines.len(), 1);

    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 50)
        .await;
    let full = locations.view_bin_occupancy(layout.bin_large.id).await.unwrap();
    assert_eq!(full.status, OccupancyStatus::Full);
    assert_eq!(full.occupied, 100);

    let not_a_bin = locations.view_bin_occupancy(layout.rack.id).await;
    assert_matches!(not_a_bin, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn occupancy_listing_filters_by_status_and_is_repeatable() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_small.id, 40)
        .await;
    let locations = &app.services().locations;

    let filter = OccupancyFilter {
        warehouse_id: Some(layout.warehouse_id),
        zone_id: None,
        status: Some(OccupancyStatus::Full),
    };
    let first = locations
        .list_bin_occupancy(filter.clone(), PageRequest::default())
        .await
        .unwrap();
    let second = locations
        .list_bin_occupancy(filter, PageRequest::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total, 1);
    assert_eq!(first.items[0].location_id, layout.bin_small.id);
}

#[tokio::test]
async fn list_locations_orders_by_code_and_filters() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let locations = &app.services().locations;

    let bins = locations
        .list_locations(
            LocationFilter {
                zone_id: Some(layout.storage_zone.id),
                location_type: Some(LocationType::Bin),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    let codes: Vec<_> = bins.items.iter().map(|v| v.location.code.as_str()).collect();
    assert_eq!(codes, vec!["B-01", "B-02"]);
    assert_eq!(bins.items[0].zone_code.as_deref(), Some("Z-ELEC"));
    assert_eq!(bins.items[0].parent_code.as_deref(), Some("R-01"));

    let again = locations
        .list_locations(
            LocationFilter {
                zone_id: Some(layout.storage_zone.id),
                location_type: Some(LocationType::Bin),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(bins, again);
}

#[tokio::test]
async fn empty_bin_search_skips_staging_and_occupied_bins() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 1)
        .await;

    let empty = app
        .services()
        .locations
        .search_empty_bins(layout.warehouse_id, None, 10)
        .await
        .unwrap();

    let ids: Vec<_> = empty.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![layout.bin_small.id]);
}

#[tokio::test]
async fn staging_is_resolved_per_warehouse() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let staging = app
        .services()
        .locations
        .staging_location(layout.warehouse_id)
        .await
        .unwrap();
    assert_eq!(staging.id, layout.staging.id);

    let missing = app.services().locations.staging_location(Uuid::new_v4()).await;
    assert_matches!(missing, Err(ServiceError::PreconditionFailed(_)));
}
