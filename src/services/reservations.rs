//! Reservation engine.
//!
//! Reservations are warehouse-scoped holds booked on the staging anchor row
//! `(warehouse, sku, no lot, staging bin)`. Because every reserver of a sku
//! increments that one row, concurrent reservations serialize on its lock and
//! the availability re-read after the increment is the enforcement point.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{Actor, Permission};
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::reservation::{self, Entity as Reservation, ReservationStatus};
use crate::errors::{ServiceError, StockShortage};
use crate::events::{Event, EventSender};
use crate::services::ledger::{self, DocumentRef, LedgerKey};
use crate::services::locations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub sku_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub released: Vec<reservation::Model>,
    pub total_quantity: i64,
}

/// Reserves every line against `reference` or none of them.
///
/// Runs inside the caller's transaction; an error leaves partial increments
/// behind that the caller's rollback discards.
pub async fn reserve_in<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    lines: &[ReservationLine],
    reference: DocumentRef,
    actor: &Actor,
) -> Result<Vec<reservation::Model>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "nothing to reserve".to_string(),
        ));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
        return Err(ServiceError::ValidationError(format!(
            "reservation quantity for sku {} must be positive",
            line.sku_id
        )));
    }

    let anchor = locations::resolve_staging(conn, warehouse_id).await?;
    let now = Utc::now();
    let mut created = Vec::with_capacity(lines.len());
    let mut shortages = Vec::new();

    for line in lines {
        let key = LedgerKey::new(warehouse_id, line.sku_id, None, anchor.id);
        ledger::increment_reserved(conn, &key, line.quantity).await?;
        ledger::record_transaction(
            conn,
            key,
            -line.quantity,
            TransactionType::Reserve,
            reference,
            actor,
        )
        .await?;

        let held = reservation::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(warehouse_id),
            sku_id: Set(line.sku_id),
            anchor_location_id: Set(anchor.id),
            quantity: Set(line.quantity),
            reference_table: Set(reference.table.to_string()),
            reference_id: Set(reference.id),
            status: Set(ReservationStatus::Open),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            released_at: Set(None),
        }
        .insert(conn)
        .await?;
        created.push(held);

        // Re-read after the increment; a concurrent reserver may have won the row first.
        let level = ledger::stock_level(conn, warehouse_id, line.sku_id).await?;
        if level.net() < 0 {
            shortages.push(StockShortage {
                sku_id: line.sku_id,
                available: (level.net() + line.quantity).max(0),
                requested: line.quantity,
            });
        }
    }

    if !shortages.is_empty() {
        warn!(
            reference_table = reference.table,
            reference_id = %reference.id,
            short_lines = shortages.len(),
            "Reservation would over-commit stock"
        );
        return Err(ServiceError::InsufficientStock(shortages));
    }
    Ok(created)
}

/// Closes every open reservation of `reference` and returns its hold to availability.
pub async fn release_in<C: ConnectionTrait>(
    conn: &C,
    reference: DocumentRef,
    actor: &Actor,
) -> Result<ReleaseSummary, ServiceError> {
    let open = open_reservations(conn, reference).await?;
    let now = Utc::now();
    let mut released = Vec::with_capacity(open.len());
    let mut total_quantity = 0;

    for held in open {
        let key = LedgerKey::new(held.warehouse_id, held.sku_id, None, held.anchor_location_id);
        ledger::decrement_reserved(conn, &key, held.quantity).await?;
        ledger::record_transaction(
            conn,
            key,
            held.quantity,
            TransactionType::Release,
            reference,
            actor,
        )
        .await?;

        total_quantity += held.quantity;
        let mut active: reservation::ActiveModel = held.into();
        active.status = Set(ReservationStatus::Released);
        active.released_at = Set(Some(now));
        released.push(active.update(conn).await?);
    }

    Ok(ReleaseSummary {
        released,
        total_quantity,
    })
}

pub async fn open_reservations<C: ConnectionTrait>(
    conn: &C,
    reference: DocumentRef,
) -> Result<Vec<reservation::Model>, ServiceError> {
    Ok(Reservation::find()
        .filter(reservation::Column::ReferenceTable.eq(reference.table))
        .filter(reservation::Column::ReferenceId.eq(reference.id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Open))
        .order_by_asc(reservation::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Service wrapper running reservations in their own unit of work.
#[derive(Clone)]
pub struct ReservationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReservationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reserve(
        &self,
        warehouse_id: Uuid,
        lines: &[ReservationLine],
        reference: DocumentRef,
        actor: &Actor,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        actor.require(Permission::ApproveOutbound)?;
        let txn = self.db.begin().await?;
        let created = reserve_in(&txn, warehouse_id, lines, reference, actor).await?;
        txn.commit().await?;

        let total_quantity = created.iter().map(|r| r.quantity).sum();
        info!(reference_id = %reference.id, total_quantity, "Inventory reserved");
        self.event_sender
            .emit(Event::InventoryReserved {
                warehouse_id,
                reference_table: reference.table.to_string(),
                reference_id: reference.id,
                total_quantity,
            })
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn release(
        &self,
        reference: DocumentRef,
        actor: &Actor,
    ) -> Result<ReleaseSummary, ServiceError> {
        actor.require(Permission::ApproveOutbound)?;
        let txn = self.db.begin().await?;
        let summary = release_in(&txn, reference, actor).await?;
        txn.commit().await?;

        if let Some(first) = summary.released.first() {
            info!(reference_id = %reference.id, total_quantity = summary.total_quantity, "Inventory released");
            self.event_sender
                .emit(Event::InventoryReleased {
                    warehouse_id: first.warehouse_id,
                    reference_table: reference.table.to_string(),
                    reference_id: reference.id,
                    total_quantity: summary.total_quantity,
                })
                .await;
        }
        Ok(summary)
    }

    pub async fn list_for_reference(
        &self,
        reference: DocumentRef,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        Ok(Reservation::find()
            .filter(reservation::Column::ReferenceTable.eq(reference.table))
            .filter(reservation::Column::ReferenceId.eq(reference.id))
            .order_by_asc(reservation::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
