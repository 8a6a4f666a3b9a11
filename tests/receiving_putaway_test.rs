mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{keeper, manager, staff, today, Layout, TestApp};
use wms_core::{
    entities::{
        location::LocationType,
        putaway_task::PutawayStatus,
        putaway_task_item,
        receiving_order::{ReceivingSource, ReceivingStatus},
    },
    errors::ServiceError,
    services::{
        ledger::{self, LedgerKey},
        putaway::PutawayConfirmation,
        receiving::{CreateReceivingRequest, PostingOutcome, ReceivingLineInput},
    },
};

fn receiving_line(sku_id: Uuid, quantity: i64, lot_number: Option<&str>) -> ReceivingLineInput {
    ReceivingLineInput {
        sku_id,
        quantity,
        lot_number: lot_number.map(str::to_string),
        manufactured_on: lot_number.map(|_| today() - Duration::days(30)),
        expires_on: lot_number.map(|_| today() + Duration::days(300)),
    }
}

/// Creates, submits, approves and posts a receiving order.
async fn receive(app: &TestApp, layout: &Layout, lines: Vec<ReceivingLineInput>) -> PostingOutcome {
    let receiving = &app.services().receiving;
    let order = receiving
        .create(
            CreateReceivingRequest {
                warehouse_id: layout.warehouse_id,
                source_type: ReceivingSource::Supplier,
                notes: None,
                lines,
            },
            &keeper(),
        )
        .await
        .expect("create receiving order");
    receiving
        .submit(order.order.id, &keeper())
        .await
        .expect("submit receiving order");
    receiving
        .approve(order.order.id, &manager())
        .await
        .expect("approve receiving order");
    receiving
        .post(order.order.id, &manager())
        .await
        .expect("post receiving order")
}

fn item_for(items: &[putaway_task_item::Model], sku_id: Uuid) -> &putaway_task_item::Model {
    items
        .iter()
        .find(|i| i.sku_id == sku_id)
        .expect("task item for sku")
}

async fn occupied(app: &TestApp, location_id: Uuid) -> i64 {
    ledger::occupied_qty(app.db(), location_id).await.unwrap()
}

#[tokio::test]
async fn posting_books_stock_at_staging_and_opens_a_task() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let loose = app.seed_sku("SKU-CABLE", None).await;

    let posted = receive(
        &app,
        &layout,
        vec![
            receiving_line(layout.sku.id, 30, Some("LOT-A")),
            receiving_line(loose.id, 10, None),
        ],
    )
    .await;

    assert_eq!(posted.order.order.status, ReceivingStatus::Posted);
    assert!(posted.order.order.posted_at.is_some());
    assert!(posted
        .order
        .order
        .code
        .starts_with(&format!("GRN-{}-", Utc::now().format("%Y%m%d"))));
    assert_eq!(posted.lots.len(), 1);
    assert_eq!(posted.lots[0].lot_number, "LOT-A");

    let lot_id = posted.lots[0].id;
    let lotted = posted
        .order
        .items
        .iter()
        .find(|i| i.sku_id == layout.sku.id)
        .unwrap();
    assert_eq!(lotted.lot_id, Some(lot_id));

    assert_eq!(posted.putaway_task.status, PutawayStatus::Open);
    assert_eq!(posted.putaway_task.from_location_id, layout.staging.id);
    assert_eq!(posted.putaway_items.len(), 2);
    assert!(posted
        .putaway_items
        .iter()
        .all(|i| i.suggested_location_id == layout.staging.id && i.putaway_qty == 0));

    assert_eq!(occupied(&app, layout.staging.id).await, 40);
    let lot_cell = ledger::find_cell(
        app.db(),
        &LedgerKey::new(layout.warehouse_id, layout.sku.id, Some(lot_id), layout.staging.id),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(lot_cell.quantity, 30);
}

#[tokio::test]
async fn lots_are_reused_across_receipts() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;

    let first = receive(&app, &layout, vec![receiving_line(layout.sku.id, 5, Some("LOT-A"))]).await;
    let second = receive(&app, &layout, vec![receiving_line(layout.sku.id, 7, Some("LOT-A"))]).await;

    assert_eq!(first.lots[0].id, second.lots[0].id);
    assert_eq!(
        first.order.order.code.rsplit('-').next(),
        Some("0001")
    );
    assert_eq!(
        second.order.order.code.rsplit('-').next(),
        Some("0002")
    );
}

#[tokio::test]
async fn receiving_moves_one_status_at_a_time() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let receiving = &app.services().receiving;

    let order = receiving
        .create(
            CreateReceivingRequest {
                warehouse_id: layout.warehouse_id,
                source_type: ReceivingSource::Return,
                notes: None,
                lines: vec![receiving_line(layout.sku.id, 3, None)],
            },
            &staff(),
        )
        .await
        .unwrap();
    assert_eq!(order.order.status, ReceivingStatus::Draft);

    assert_matches!(
        receiving.post(order.order.id, &manager()).await,
        Err(ServiceError::InvalidTransition(_))
    );
    assert_matches!(
        receiving.approve(order.order.id, &manager()).await,
        Err(ServiceError::InvalidTransition(_))
    );
    assert_matches!(
        receiving.approve(order.order.id, &keeper()).await,
        Err(ServiceError::Forbidden(_))
    );

    receiving.submit(order.order.id, &staff()).await.unwrap();
    assert_matches!(
        receiving.submit(order.order.id, &staff()).await,
        Err(ServiceError::InvalidTransition(_))
    );
    let approved = receiving.approve(order.order.id, &manager()).await.unwrap();
    assert_eq!(approved.status, ReceivingStatus::Approved);
    assert!(approved.approved_by.is_some());
}

#[tokio::test]
async fn receiving_lines_are_validated() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let receiving = &app.services().receiving;
    let request = |lines| CreateReceivingRequest {
        warehouse_id: layout.warehouse_id,
        source_type: ReceivingSource::Supplier,
        notes: None,
        lines,
    };

    let mut backwards = receiving_line(layout.sku.id, 3, Some("LOT-B"));
    backwards.expires_on = Some(today() - Duration::days(60));
    assert_matches!(
        receiving.create(request(vec![backwards]), &keeper()).await,
        Err(ServiceError::DateViolation(_))
    );

    let mut dates_without_lot = receiving_line(layout.sku.id, 3, None);
    dates_without_lot.expires_on = Some(today());
    assert_matches!(
        receiving.create(request(vec![dates_without_lot]), &keeper()).await,
        Err(ServiceError::ValidationError(_))
    );

    let blank_lot = receiving_line(layout.sku.id, 3, Some("   "));
    assert_matches!(
        receiving.create(request(vec![blank_lot]), &keeper()).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_matches!(
        receiving
            .create(request(vec![receiving_line(layout.sku.id, -1, None)]), &keeper())
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        receiving.create(request(vec![]), &keeper()).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        receiving
            .create(request(vec![receiving_line(Uuid::new_v4(), 1, None)]), &keeper())
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn posting_requires_a_staging_bin() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let locations = &app.services().locations;
    locations
        .deactivate_location(layout.staging.id, &manager())
        .await
        .unwrap();

    let receiving = &app.services().receiving;
    let order = receiving
        .create(
            CreateReceivingRequest {
                warehouse_id: layout.warehouse_id,
                source_type: ReceivingSource::Transfer,
                notes: None,
                lines: vec![receiving_line(layout.sku.id, 3, None)],
            },
            &keeper(),
        )
        .await
        .unwrap();
    receiving.submit(order.order.id, &keeper()).await.unwrap();
    receiving.approve(order.order.id, &manager()).await.unwrap();

    assert_matches!(
        receiving.post(order.order.id, &manager()).await,
        Err(ServiceError::PreconditionFailed(_))
    );
    let unchanged = receiving.get(order.order.id).await.unwrap();
    assert_eq!(unchanged.order.status, ReceivingStatus::Approved);
}

#[tokio::test]
async fn refine_points_items_at_their_category_zone() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let loose = app.seed_sku("SKU-CABLE", None).await;
    let posted = receive(
        &app,
        &layout,
        vec![
            receiving_line(layout.sku.id, 30, None),
            receiving_line(loose.id, 10, None),
        ],
    )
    .await;

    let refined = app
        .services()
        .putaway
        .refine_suggestions(posted.putaway_task.id, &keeper())
        .await
        .unwrap();

    assert_eq!(
        item_for(&refined.items, layout.sku.id).suggested_location_id,
        layout.bin_large.id
    );
    assert_eq!(
        item_for(&refined.items, loose.id).suggested_location_id,
        layout.staging.id
    );

    assert_matches!(
        app.services()
            .putaway
            .refine_suggestions(posted.putaway_task.id, &staff())
            .await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn confirming_every_item_completes_the_task() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let second = app.seed_sku("SKU-TV-02", Some(layout.category.id)).await;
    let posted = receive(
        &app,
        &layout,
        vec![
            receiving_line(layout.sku.id, 30, Some("LOT-A")),
            receiving_line(second.id, 10, None),
        ],
    )
    .await;
    let task_id = posted.putaway_task.id;
    let first_item = item_for(&posted.putaway_items, layout.sku.id).id;
    let second_item = item_for(&posted.putaway_items, second.id).id;
    let putaway = &app.services().putaway;

    let partial = putaway
        .confirm(
            task_id,
            &[PutawayConfirmation {
                item_id: first_item,
                location_id: layout.bin_large.id,
                quantity: 20,
            }],
            &keeper(),
        )
        .await
        .unwrap();
    assert_eq!(partial.task.status, PutawayStatus::InProgress);
    assert_eq!(partial.remaining(), 20);
    assert_eq!(occupied(&app, layout.staging.id).await, 20);
    assert_eq!(occupied(&app, layout.bin_large.id).await, 20);

    let done = putaway
        .confirm(
            task_id,
            &[
                PutawayConfirmation {
                    item_id: first_item,
                    location_id: layout.bin_large.id,
                    quantity: 10,
                },
                PutawayConfirmation {
                    item_id: second_item,
                    location_id: layout.bin_small.id,
                    quantity: 10,
                },
            ],
            &keeper(),
        )
        .await
        .unwrap();
    assert_eq!(done.task.status, PutawayStatus::Done);
    assert!(done.task.completed_at.is_some());
    assert_eq!(done.remaining(), 0);
    assert_eq!(
        item_for(&done.items, second.id).actual_location_id,
        Some(layout.bin_small.id)
    );

    assert_eq!(occupied(&app, layout.staging.id).await, 0);
    assert_eq!(occupied(&app, layout.bin_large.id).await, 30);
    assert_eq!(occupied(&app, layout.bin_small.id).await, 10);

    let stock = app
        .services()
        .inventory
        .stock_level(layout.warehouse_id, layout.sku.id)
        .await
        .unwrap();
    assert_eq!(stock.level.on_hand, 30);

    assert_matches!(
        putaway
            .confirm(
                task_id,
                &[PutawayConfirmation {
                    item_id: first_item,
                    location_id: layout.bin_large.id,
                    quantity: 1,
                }],
                &keeper(),
            )
            .await,
        Err(ServiceError::InvalidTransition(_))
    );
}

#[tokio::test]
async fn confirmation_respects_capacity_and_target_rules() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_small.id, 20)
        .await;
    let posted = receive(&app, &layout, vec![receiving_line(layout.sku.id, 30, None)]).await;
    let task_id = posted.putaway_task.id;
    let item_id = posted.putaway_items[0].id;
    let putaway = &app.services().putaway;
    let confirm = |location_id, quantity| {
        [PutawayConfirmation {
            item_id,
            location_id,
            quantity,
        }]
    };

    assert_matches!(
        putaway
            .confirm(task_id, &confirm(layout.bin_small.id, 25), &keeper())
            .await,
        Err(ServiceError::CapacityViolation(_))
    );
    assert_matches!(
        putaway
            .confirm(task_id, &confirm(layout.bin_large.id, 31), &keeper())
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        putaway
            .confirm(task_id, &confirm(layout.staging.id, 5), &keeper())
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        putaway
            .confirm(task_id, &confirm(layout.rack.id, 5), &keeper())
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        putaway
            .confirm(
                task_id,
                &[PutawayConfirmation {
                    item_id: Uuid::new_v4(),
                    location_id: layout.bin_large.id,
                    quantity: 1,
                }],
                &keeper(),
            )
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        putaway
            .confirm(task_id, &confirm(layout.bin_large.id, 5), &staff())
            .await,
        Err(ServiceError::Forbidden(_))
    );

    // Failed confirmations leave the ledger and the task untouched.
    assert_eq!(occupied(&app, layout.staging.id).await, 30);
    let task = putaway.get_task(task_id).await.unwrap();
    assert_eq!(task.task.status, PutawayStatus::Open);
    assert_eq!(task.remaining(), 30);

    // Exactly filling the small bin is allowed.
    let filled = putaway
        .confirm(task_id, &confirm(layout.bin_small.id, 20), &keeper())
        .await
        .unwrap();
    assert_eq!(filled.task.status, PutawayStatus::InProgress);
    let view = app
        .services()
        .locations
        .view_bin_occupancy(layout.bin_small.id)
        .await
        .unwrap();
    assert_eq!(view.occupied, 40);
    assert_eq!(view.status, wms_core::services::ledger::OccupancyStatus::Full);
}

#[tokio::test]
async fn suggestions_pick_the_roomiest_bin_of_the_category_zone() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let putaway = &app.services().putaway;

    let roomiest = putaway
        .suggest(layout.warehouse_id, layout.sku.id, 10)
        .await
        .unwrap()
        .expect("a suggestion");
    assert_eq!(roomiest.location_id, layout.bin_large.id);
    assert_eq!(roomiest.zone_code, "Z-ELEC");
    assert_eq!(roomiest.rack_code.as_deref(), Some("R-01"));
    assert_eq!(roomiest.aisle_code.as_deref(), Some("A-01"));
    assert_eq!(roomiest.residual_capacity, 100);

    app.seed_stock(layout.warehouse_id, layout.sku.id, layout.bin_large.id, 70)
        .await;
    let shifted = putaway
        .suggest(layout.warehouse_id, layout.sku.id, 10)
        .await
        .unwrap()
        .expect("a suggestion");
    assert_eq!(shifted.location_id, layout.bin_small.id);
    assert_eq!(shifted.residual_capacity, 40);

    let too_big = putaway
        .suggest(layout.warehouse_id, layout.sku.id, 41)
        .await
        .unwrap();
    assert!(too_big.is_none());
}

#[tokio::test]
async fn missing_category_zone_yields_no_suggestion() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let frozen = app.seed_category("FROZEN").await;
    let peas = app.seed_sku("SKU-PEAS", Some(frozen.id)).await;
    let loose = app.seed_sku("SKU-LOOSE", None).await;
    let putaway = &app.services().putaway;

    assert!(putaway
        .suggest(layout.warehouse_id, peas.id, 1)
        .await
        .unwrap()
        .is_none());
    assert!(putaway
        .suggest(layout.warehouse_id, loose.id, 1)
        .await
        .unwrap()
        .is_none());

    // A zone of the right code in another warehouse does not count.
    let elsewhere = app.seed_zone(Uuid::new_v4(), "Z-FROZEN").await;
    assert_ne!(elsewhere.warehouse_id, layout.warehouse_id);
    assert!(putaway
        .suggest(layout.warehouse_id, peas.id, 1)
        .await
        .unwrap()
        .is_none());

    let batch = putaway
        .suggest_batch(layout.warehouse_id, &[layout.sku.id, peas.id], &[5, 5])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].sku_id, layout.sku.id);

    assert_matches!(
        putaway
            .suggest_batch(layout.warehouse_id, &[layout.sku.id], &[1, 2])
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn equal_room_ties_go_to_the_lowest_code() {
    let app = TestApp::new().await;
    let layout = app.seed_layout().await;
    let twin = app
        .create_location(
            &layout.storage_zone,
            "B-00",
            LocationType::Bin,
            Some(layout.rack.id),
            Some(rust_decimal::Decimal::from(100)),
            false,
        )
        .await;

    let suggestion = app
        .services()
        .putaway
        .suggest(layout.warehouse_id, layout.sku.id, 5)
        .await
        .unwrap()
        .expect("a suggestion");
    assert_eq!(suggestion.location_id, twin.id);
}
