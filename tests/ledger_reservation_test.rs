mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{admin, manager, staff, TestApp};
use wms_core::{
    entities::{inventory_transaction::TransactionType, reservation::ReservationStatus},
    errors::ServiceError,
    services::{
        ledger::{self, DocumentRef, LedgerKey, MovementFilter},
        reservations::ReservationLine,
    },
    PageRequest,
};

#[tokio::test]
async fn movements_update_cells_and_append_to_the_log() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let key = LedgerKey::new(layout.warehouse_id, layout.sku.id, None, layout.bin_large.id);
    let reference = DocumentRef::new("receiving_orders", Uuid::new_v4());

    ledger::apply_movement(app.db(), key, 30, TransactionType::Receive, reference, &admin())
        .await
        .unwrap();
    ledger::apply_movement(app.db(), key, -12, TransactionType::Putaway, reference, &admin())
        .await
        .unwrap();

    let cell = ledger::find_cell(app.db(), &key).await.unwrap().expect("cell exists");
    assert_eq!(cell.quantity, 18);
    assert_eq!(cell.reserved_qty, 0);
    assert_eq!(cell.lot_key, ledger::NO_LOT);

    let log = app
        .services()
        .inventory
        .list_movements(
            MovementFilter {
                location_id: Some(layout.bin_large.id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(log.total, 2);
    let quantities: Vec<i64> = log.items.iter().map(|t| t.quantity).collect();
    assert!(quantities.contains(&30));
    assert!(quantities.contains(&-12));
}

#[tokio::test]
async fn debit_beyond_on_hand_is_refused() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 5)
        .await;
    let key = LedgerKey::new(layout.warehouse_id, layout.sku.id, None, layout.bin_large.id);

    let err = ledger::apply_movement(
        app.db(),
        key,
        -6,
        TransactionType::Putaway,
        DocumentRef::new("putaway_tasks", Uuid::new_v4()),
        &admin(),
    )
    .await
    .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(lines) => {
        assert_eq!(lines[0].available, 5);
        assert_eq!(lines[0].requested, 6);
    });
    let cell = ledger::find_cell(app.db(), &key).await.unwrap().unwrap();
    assert_eq!(cell.quantity, 5);
}

#[tokio::test]
async fn zero_movement_is_a_validation_error() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let err = ledger::apply_movement(
        app.db(),
        LedgerKey::new(layout.warehouse_id, layout.sku.id, None, layout.bin_large.id),
        0,
        TransactionType::Receive,
        DocumentRef::new("receiving_orders", Uuid::new_v4()),
        &admin(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn stock_level_sums_every_cell_of_the_warehouse() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 20)
        .await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_small.id, 15)
        .await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.staging.id, 5)
        .await;

    let stock = app
        .services()
        .inventory
        .stock_level(layout.warehouse_id, layout.sku.id)
        .await
        .unwrap();
    assert_eq!(stock.level.on_hand, 40);
    assert_eq!(stock.level.reserved, 0);
    assert_eq!(stock.level.available, 40);

    let other_sku = Uuid::new_v4();
    let batch = app
        .services()
        .inventory
        .stock_levels(layout.warehouse_id, &[layout.sku.id, other_sku])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    let missing = batch.iter().find(|s| s.sku_id == other_sku).unwrap();
    assert_eq!(missing.level.on_hand, 0);
}

#[tokio::test]
async fn reservation_holds_stock_on_the_staging_anchor() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 30)
        .await;
    let reference = DocumentRef::new("sales_orders", Uuid::new_v4());

    let held = app
        .services()
        .reservations
        .reserve(
            layout.warehouse_id,
            &[ReservationLine {
                sku_id: layout.sku.id,
                quantity: 20,
            }],
            reference,
            &manager(),
        )
        .await
        .unwrap();

    assert_eq!(held.len(), 1);
    assert_eq!(held[0].anchor_location_id, layout.staging.id);
    assert_eq!(held[0].status, ReservationStatus::Open);

    let available = app
        .services()
        .inventory
        .available_qty(layout.warehouse_id, layout.sku.id)
        .await
        .unwrap();
    assert_eq!(available, 10);

    let anchor = LedgerKey::new(layout.warehouse_id, layout.sku.id, None, layout.staging.id);
    let cell = ledger::find_cell(app.db(), &anchor).await.unwrap().unwrap();
    assert_eq!(cell.quantity, 0);
    assert_eq!(cell.reserved_qty, 20);

    let log = app
        .services()
        .inventory
        .list_movements(
            MovementFilter {
                reference_id: Some(reference.id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(log.total, 1);
    assert_eq!(log.items[0].txn_type, TransactionType::Reserve);
    assert_eq!(log.items[0].quantity, -20);
}

#[tokio::test]
async fn over_reservation_is_rolled_back_entirely() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let second_sku = app.seed_sku("SKU-TV-02", Some(layout.category.id)).await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 30)
        .await;
    app.seed_stock(layout.warehouse_id, second_sku.id, layout.bin_small.id, 5)
        .await;

    let err = app
        .services()
        .reservations
        .reserve(
            layout.warehouse_id,
            &[
                ReservationLine {
                    sku_id: layout.sku.id,
                    quantity: 10,
                },
                ReservationLine {
                    sku_id: second_sku.id,
                    quantity: 8,
                },
            ],
            DocumentRef::new("sales_orders", Uuid::new_v4()),
            &manager(),
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(lines) => {
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sku_id, second_sku.id);
        assert_eq!(lines[0].available, 5);
        assert_eq!(lines[0].requested, 8);
    });

    let first = app
        .services()
        .inventory
        .stock_level(layout.warehouse_id, layout.sku.id)
        .await
        .unwrap();
    assert_eq!(first.level.reserved, 0);
    assert_eq!(first.level.available, 30);
}

#[tokio::test]
async fn release_returns_the_hold_once() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 30)
        .await;
    let reference = DocumentRef::new("transfers", Uuid::new_v4());
    let reservations = &app.services().reservations;

    reservations
        .reserve(
            layout.warehouse_id,
            &[ReservationLine {
                sku_id: layout.sku.id,
                quantity: 12,
            }],
            reference,
            &manager(),
        )
        .await
        .unwrap();

    let summary = reservations.release(reference, &manager()).await.unwrap();
    assert_eq!(summary.total_quantity, 12);
    assert_eq!(summary.released[0].status, ReservationStatus::Released);
    assert!(summary.released[0].released_at.is_some());

    let available = app
        .services()
        .inventory
        .available_qty(layout.warehouse_id, layout.sku.id)
        .await
        .unwrap();
    assert_eq!(available, 30);

    let again = reservations.release(reference, &manager()).await.unwrap();
    assert_eq!(again.total_quantity, 0);
    assert!(again.released.is_empty());

    let history = reservations.list_for_reference(reference).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn staff_cannot_reserve() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let err = app
        .services()
        .reservations
        .reserve(
            layout.warehouse_id,
            &[ReservationLine {
                sku_id: layout.sku.id,
                quantity: 1,
            }],
            DocumentRef::new("sales_orders", Uuid::new_v4()),
            &staff(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}
