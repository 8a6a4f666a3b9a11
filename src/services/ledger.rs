//! Inventory snapshot ledger.
//!
//! One snapshot row per `(warehouse, sku, lot, location)` cell holds the
//! on-hand and reserved quantities; every change to them is paired with an
//! append-only `inventory_transactions` row written in the same unit of work.
//! Increments are single upsert statements and decrements are guarded
//! updates, so concurrent writers never lose an update and a cell can never go
//! negative.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use validator::ValidationError;

use crate::auth::Actor;
use crate::entities::inventory_snapshot::{self, Entity as InventorySnapshot};
use crate::entities::inventory_transaction::{
    self, Entity as InventoryTransaction, TransactionType,
};
use crate::errors::{ServiceError, StockShortage};
use crate::{PageRequest, PaginatedResponse};

/// Stored in `lot_key` when a cell carries no lot.
pub const NO_LOT: Uuid = Uuid::nil();

/// Residual capacity assumed for bins without a configured maximum.
pub const UNBOUNDED_CAPACITY: i64 = 1_000_000_000;

/// Identity of one ledger cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub location_id: Uuid,
}

impl LedgerKey {
    pub fn new(warehouse_id: Uuid, sku_id: Uuid, lot_id: Option<Uuid>, location_id: Uuid) -> Self {
        Self {
            warehouse_id,
            sku_id,
            lot_id,
            location_id,
        }
    }

    pub fn lot_key(&self) -> Uuid {
        self.lot_id.unwrap_or(NO_LOT)
    }

    /// The same sku and lot at another location.
    pub fn at(self, location_id: Uuid) -> Self {
        Self {
            location_id,
            ..self
        }
    }

    fn condition(&self) -> Condition {
        Condition::all()
            .add(inventory_snapshot::Column::WarehouseId.eq(self.warehouse_id))
            .add(inventory_snapshot::Column::SkuId.eq(self.sku_id))
            .add(inventory_snapshot::Column::LotKey.eq(self.lot_key()))
            .add(inventory_snapshot::Column::LocationId.eq(self.location_id))
    }
}

/// Source document a movement is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef {
    pub table: &'static str,
    pub id: Uuid,
}

impl DocumentRef {
    pub fn new(table: &'static str, id: Uuid) -> Self {
        Self { table, id }
    }
}

/// Warehouse-wide totals for one sku.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub on_hand: i64,
    pub reserved: i64,
    pub available: i64,
}

impl StockLevel {
    pub fn from_totals(on_hand: i64, reserved: i64) -> Self {
        Self {
            on_hand,
            reserved,
            available: (on_hand - reserved).max(0),
        }
    }

    /// Signed difference; negative once reservations exceed stock.
    pub fn net(&self) -> i64 {
        self.on_hand - self.reserved
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum OccupancyStatus {
    Empty,
    Partial,
    Full,
}

impl OccupancyStatus {
    pub fn classify(occupied: i64, capacity: Option<Decimal>) -> Self {
        if occupied <= 0 {
            return OccupancyStatus::Empty;
        }
        match capacity {
            Some(max) if Decimal::from(occupied) >= max => OccupancyStatus::Full,
            _ => OccupancyStatus::Partial,
        }
    }
}

/// Field validator for movement and line quantities.
pub fn validate_positive_quantity(value: i64) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Quantity must be greater than 0".into());
        Err(err)
    }
}

/// Room left in a bin, using [`UNBOUNDED_CAPACITY`] when no maximum is set.
pub fn residual_capacity(capacity: Option<Decimal>, occupied: i64) -> i64 {
    let max = capacity
        .map(|c| c.floor().to_i64().unwrap_or(UNBOUNDED_CAPACITY))
        .unwrap_or(UNBOUNDED_CAPACITY);
    max - occupied
}

/// Changes on-hand quantity of a cell and logs the movement.
///
/// Positive deltas create the cell on first use; negative deltas fail with
/// `InsufficientStock` when the cell holds less than requested.
pub async fn apply_movement<C: ConnectionTrait>(
    conn: &C,
    key: LedgerKey,
    delta: i64,
    txn_type: TransactionType,
    reference: DocumentRef,
    actor: &Actor,
) -> Result<inventory_transaction::Model, ServiceError> {
    if delta == 0 {
        return Err(ServiceError::ValidationError(
            "movement quantity must be non-zero".to_string(),
        ));
    }

    let now = Utc::now();
    if delta > 0 {
        credit(conn, &key, delta, now).await?;
    } else {
        debit(conn, &key, -delta, now).await?;
    }

    let entry = record_transaction(conn, key, delta, txn_type, reference, actor).await?;
    debug!(
        sku_id = %key.sku_id,
        location_id = %key.location_id,
        delta,
        txn_type = %txn_type,
        "Applied ledger movement"
    );
    Ok(entry)
}

/// Appends to the movement log without touching on-hand quantity.
pub async fn record_transaction<C: ConnectionTrait>(
    conn: &C,
    key: LedgerKey,
    quantity: i64,
    txn_type: TransactionType,
    reference: DocumentRef,
    actor: &Actor,
) -> Result<inventory_transaction::Model, ServiceError> {
    let entry = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(key.warehouse_id),
        sku_id: Set(key.sku_id),
        lot_id: Set(key.lot_id),
        location_id: Set(key.location_id),
        quantity: Set(quantity),
        txn_type: Set(txn_type),
        reference_table: Set(reference.table.to_string()),
        reference_id: Set(reference.id),
        created_by: Set(actor.user_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    counter!("wms_ledger.transactions", 1, "txn_type" => txn_type.to_string());
    Ok(entry)
}

fn cell_conflict() -> OnConflict {
    OnConflict::columns([
        inventory_snapshot::Column::WarehouseId,
        inventory_snapshot::Column::SkuId,
        inventory_snapshot::Column::LotKey,
        inventory_snapshot::Column::LocationId,
    ])
}

fn new_cell(key: &LedgerKey, quantity: i64, reserved: i64, now: DateTime<Utc>) -> inventory_snapshot::ActiveModel {
    inventory_snapshot::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_id: Set(key.warehouse_id),
        sku_id: Set(key.sku_id),
        lot_id: Set(key.lot_id),
        lot_key: Set(key.lot_key()),
        location_id: Set(key.location_id),
        quantity: Set(quantity),
        reserved_qty: Set(reserved),
        updated_at: Set(now),
    }
}

async fn credit<C: ConnectionTrait>(
    conn: &C,
    key: &LedgerKey,
    qty: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    InventorySnapshot::insert(new_cell(key, qty, 0, now))
        .on_conflict(
            cell_conflict()
                .value(
                    inventory_snapshot::Column::Quantity,
                    Expr::col((InventorySnapshot, inventory_snapshot::Column::Quantity)).add(qty),
                )
                .update_column(inventory_snapshot::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn debit<C: ConnectionTrait>(
    conn: &C,
    key: &LedgerKey,
    qty: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let result = InventorySnapshot::update_many()
        .col_expr(
            inventory_snapshot::Column::Quantity,
            Expr::col(inventory_snapshot::Column::Quantity).sub(qty),
        )
        .col_expr(inventory_snapshot::Column::UpdatedAt, Expr::value(now))
        .filter(key.condition())
        .filter(inventory_snapshot::Column::Quantity.gte(qty))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let available = find_cell(conn, key).await?.map(|c| c.quantity).unwrap_or(0);
        return Err(ServiceError::InsufficientStock(vec![StockShortage {
            sku_id: key.sku_id,
            available,
            requested: qty,
        }]));
    }
    Ok(())
}

/// Adds to the reserved quantity of a cell, creating it if needed.
pub async fn increment_reserved<C: ConnectionTrait>(
    conn: &C,
    key: &LedgerKey,
    qty: i64,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    InventorySnapshot::insert(new_cell(key, 0, qty, now))
        .on_conflict(
            cell_conflict()
                .value(
                    inventory_snapshot::Column::ReservedQty,
                    Expr::col((InventorySnapshot, inventory_snapshot::Column::ReservedQty))
                        .add(qty),
                )
                .update_column(inventory_snapshot::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Takes back a reservation hold; refuses to drive `reserved_qty` below zero.
pub async fn decrement_reserved<C: ConnectionTrait>(
    conn: &C,
    key: &LedgerKey,
    qty: i64,
) -> Result<(), ServiceError> {
    let result = InventorySnapshot::update_many()
        .col_expr(
            inventory_snapshot::Column::ReservedQty,
            Expr::col(inventory_snapshot::Column::ReservedQty).sub(qty),
        )
        .col_expr(inventory_snapshot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(key.condition())
        .filter(inventory_snapshot::Column::ReservedQty.gte(qty))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::PreconditionFailed(format!(
            "reserved quantity at location {} is below {} for sku {}",
            key.location_id, qty, key.sku_id
        )));
    }
    Ok(())
}

pub async fn find_cell<C: ConnectionTrait>(
    conn: &C,
    key: &LedgerKey,
) -> Result<Option<inventory_snapshot::Model>, ServiceError> {
    Ok(InventorySnapshot::find()
        .filter(key.condition())
        .one(conn)
        .await?)
}

// SUM(bigint) is NUMERIC on Postgres; cast back so both backends decode as i64.
fn bigint_sum(column: inventory_snapshot::Column) -> SimpleExpr {
    column.sum().cast_as(Alias::new("BIGINT"))
}

/// Total on-hand quantity held at a location across all skus and lots.
pub async fn occupied_qty<C: ConnectionTrait>(conn: &C, location_id: Uuid) -> Result<i64, ServiceError> {
    let total = InventorySnapshot::find()
        .select_only()
        .column_as(bigint_sum(inventory_snapshot::Column::Quantity), "total")
        .filter(inventory_snapshot::Column::LocationId.eq(location_id))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Batched [`occupied_qty`]; locations without stock map to zero.
pub async fn occupied_by_location<C: ConnectionTrait>(
    conn: &C,
    location_ids: &[Uuid],
) -> Result<HashMap<Uuid, i64>, ServiceError> {
    let mut occupied: HashMap<Uuid, i64> = location_ids.iter().map(|id| (*id, 0)).collect();
    if location_ids.is_empty() {
        return Ok(occupied);
    }

    let rows = InventorySnapshot::find()
        .select_only()
        .column(inventory_snapshot::Column::LocationId)
        .column_as(bigint_sum(inventory_snapshot::Column::Quantity), "total")
        .filter(inventory_snapshot::Column::LocationId.is_in(location_ids.iter().copied()))
        .group_by(inventory_snapshot::Column::LocationId)
        .into_tuple::<(Uuid, Option<i64>)>()
        .all(conn)
        .await?;

    for (location_id, total) in rows {
        occupied.insert(location_id, total.unwrap_or(0));
    }
    Ok(occupied)
}

pub async fn stock_level<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    sku_id: Uuid,
) -> Result<StockLevel, ServiceError> {
    let totals = InventorySnapshot::find()
        .select_only()
        .column_as(bigint_sum(inventory_snapshot::Column::Quantity), "on_hand")
        .column_as(bigint_sum(inventory_snapshot::Column::ReservedQty), "reserved")
        .filter(inventory_snapshot::Column::WarehouseId.eq(warehouse_id))
        .filter(inventory_snapshot::Column::SkuId.eq(sku_id))
        .into_tuple::<(Option<i64>, Option<i64>)>()
        .one(conn)
        .await?;

    let (on_hand, reserved) = totals.unwrap_or((None, None));
    Ok(StockLevel::from_totals(
        on_hand.unwrap_or(0),
        reserved.unwrap_or(0),
    ))
}

/// Stock levels for several skus of one warehouse in a single query.
pub async fn stock_levels<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    sku_ids: &[Uuid],
) -> Result<HashMap<Uuid, StockLevel>, ServiceError> {
    let mut levels: HashMap<Uuid, StockLevel> = sku_ids
        .iter()
        .map(|id| (*id, StockLevel::default()))
        .collect();
    if sku_ids.is_empty() {
        return Ok(levels);
    }

    let rows = InventorySnapshot::find()
        .select_only()
        .column(inventory_snapshot::Column::SkuId)
        .column_as(bigint_sum(inventory_snapshot::Column::Quantity), "on_hand")
        .column_as(bigint_sum(inventory_snapshot::Column::ReservedQty), "reserved")
        .filter(inventory_snapshot::Column::WarehouseId.eq(warehouse_id))
        .filter(inventory_snapshot::Column::SkuId.is_in(sku_ids.iter().copied()))
        .group_by(inventory_snapshot::Column::SkuId)
        .into_tuple::<(Uuid, Option<i64>, Option<i64>)>()
        .all(conn)
        .await?;

    for (sku_id, on_hand, reserved) in rows {
        levels.insert(
            sku_id,
            StockLevel::from_totals(on_hand.unwrap_or(0), reserved.unwrap_or(0)),
        );
    }
    Ok(levels)
}

pub async fn available_qty<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    sku_id: Uuid,
) -> Result<i64, ServiceError> {
    Ok(stock_level(conn, warehouse_id, sku_id).await?.available)
}

/// Snapshot rows held at a location.
pub async fn cells_at<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
) -> Result<Vec<inventory_snapshot::Model>, ServiceError> {
    Ok(InventorySnapshot::find()
        .filter(inventory_snapshot::Column::LocationId.eq(location_id))
        .filter(inventory_snapshot::Column::Quantity.gt(0))
        .order_by_asc(inventory_snapshot::Column::SkuId)
        .all(conn)
        .await?)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MovementFilter {
    pub warehouse_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub reference_table: Option<String>,
    pub reference_id: Option<Uuid>,
}

/// Movement log, newest first.
pub async fn list_movements<C: ConnectionTrait>(
    conn: &C,
    filter: &MovementFilter,
    page: PageRequest,
) -> Result<PaginatedResponse<inventory_transaction::Model>, ServiceError> {
    let mut query = InventoryTransaction::find();
    if let Some(warehouse_id) = filter.warehouse_id {
        query = query.filter(inventory_transaction::Column::WarehouseId.eq(warehouse_id));
    }
    if let Some(sku_id) = filter.sku_id {
        query = query.filter(inventory_transaction::Column::SkuId.eq(sku_id));
    }
    if let Some(location_id) = filter.location_id {
        query = query.filter(inventory_transaction::Column::LocationId.eq(location_id));
    }
    if let Some(table) = &filter.reference_table {
        query = query.filter(inventory_transaction::Column::ReferenceTable.eq(table.as_str()));
    }
    if let Some(reference_id) = filter.reference_id {
        query = query.filter(inventory_transaction::Column::ReferenceId.eq(reference_id));
    }

    let paginator = query
        .order_by_desc(inventory_transaction::Column::CreatedAt)
        .order_by_desc(inventory_transaction::Column::Id)
        .paginate(conn, page.limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page.page.saturating_sub(1)).await?;
    Ok(PaginatedResponse::new(items, total, page))
}
