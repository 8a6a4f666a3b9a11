//! Receiving order (GRN) pipeline: DRAFT → SUBMITTED → APPROVED → POSTED.
//!
//! Posting materializes lots, credits the staging location and opens the
//! putaway task for the received lines, all in one unit of work.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, Permission};
use crate::entities::inventory_lot::{self, Entity as InventoryLot};
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::putaway_task::{self, PutawayStatus};
use crate::entities::putaway_task_item;
use crate::entities::receiving_item::{self, Entity as ReceivingItem};
use crate::entities::receiving_order::{
    self, Entity as ReceivingOrder, ReceivingSource, ReceivingStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::documents::{
    day_bounds, ensure_active_skus, format_document_code, map_code_conflict, RECEIVING_PREFIX,
};
use crate::services::ledger::{self, DocumentRef, LedgerKey};
use crate::services::locations;
use crate::{PageRequest, PaginatedResponse};

pub const RECEIVING_REFERENCE_TABLE: &str = "receiving_orders";

/// One scan-capture line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct ReceivingLineInput {
    pub sku_id: Uuid,
    #[validate(custom = "ledger::validate_positive_quantity")]
    pub quantity: i64,
    #[validate(length(min = 1, max = 64))]
    pub lot_number: Option<String>,
    pub manufactured_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
}

impl ReceivingLineInput {
    fn check_lot(&self) -> Result<(), ServiceError> {
        if matches!(&self.lot_number, Some(n) if n.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "lot number must not be blank".to_string(),
            ));
        }
        if let (Some(made), Some(expires)) = (self.manufactured_on, self.expires_on) {
            if expires < made {
                return Err(ServiceError::DateViolation(format!(
                    "lot expires on {} before it was manufactured on {}",
                    expires, made
                )));
            }
        }
        if self.lot_number.is_none() && (self.manufactured_on.is_some() || self.expires_on.is_some())
        {
            return Err(ServiceError::ValidationError(
                "lot dates require a lot number".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateReceivingRequest {
    pub warehouse_id: Uuid,
    pub source_type: ReceivingSource,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate]
    pub lines: Vec<ReceivingLineInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingOrderView {
    #[serde(flatten)]
    pub order: receiving_order::Model,
    pub items: Vec<receiving_item::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOutcome {
    pub order: ReceivingOrderView,
    pub lots: Vec<inventory_lot::Model>,
    pub putaway_task: putaway_task::Model,
    pub putaway_items: Vec<putaway_task_item::Model>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReceivingFilter {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<ReceivingStatus>,
}

#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    max_page_size: u64,
}

impl ReceivingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>, max_page_size: u64) -> Self {
        Self {
            db,
            event_sender,
            max_page_size,
        }
    }

    /// Seeds a DRAFT order from scan-capture lines.
    #[instrument(skip(self, request), fields(warehouse_id = %request.warehouse_id))]
    pub async fn create(
        &self,
        request: CreateReceivingRequest,
        actor: &Actor,
    ) -> Result<ReceivingOrderView, ServiceError> {
        actor.require(Permission::SubmitReceiving)?;
        request.validate()?;
        for line in &request.lines {
            line.check_lot()?;
        }

        let txn = self.db.begin().await?;
        let sku_ids: Vec<Uuid> = request.lines.iter().map(|l| l.sku_id).collect();
        ensure_active_skus(&txn, &sku_ids).await?;

        let now = Utc::now();
        let code = next_code(&txn, request.warehouse_id, now).await?;
        let order = receiving_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(request.warehouse_id),
            code: Set(code.clone()),
            status: Set(ReceivingStatus::Draft),
            source_type: Set(request.source_type),
            notes: Set(request.notes),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            submitted_at: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            posted_by: Set(None),
            posted_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_code_conflict(e, &code))?;

        let mut items = Vec::with_capacity(request.lines.len());
        for (line, line_no) in request.lines.into_iter().zip(1..) {
            let item = receiving_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                receiving_order_id: Set(order.id),
                line_no: Set(line_no),
                sku_id: Set(line.sku_id),
                received_qty: Set(line.quantity),
                lot_number: Set(line.lot_number.map(|n| n.trim().to_string())),
                manufactured_on: Set(line.manufactured_on),
                expires_on: Set(line.expires_on),
                lot_id: Set(None),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }
        txn.commit().await?;

        info!(receiving_order_id = %order.id, code = %order.code, lines = items.len(), "Receiving order created");
        Ok(ReceivingOrderView { order, items })
    }

    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<receiving_order::Model, ServiceError> {
        actor.require(Permission::SubmitReceiving)?;
        self.advance(order_id, ReceivingStatus::Submitted, actor).await
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<receiving_order::Model, ServiceError> {
        actor.require(Permission::ApproveReceiving)?;
        self.advance(order_id, ReceivingStatus::Approved, actor).await
    }

    /// Turns an approved order into stock at staging plus one putaway task.
    #[instrument(skip(self))]
    pub async fn post(&self, order_id: Uuid, actor: &Actor) -> Result<PostingOutcome, ServiceError> {
        actor.require(Permission::ApproveReceiving)?;

        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id, true).await?;
        expect_status(&order, ReceivingStatus::Posted)?;

        let staging = locations::resolve_staging(&txn, order.warehouse_id).await?;
        let items = order_items(&txn, order_id).await?;
        if items.is_empty() {
            return Err(ServiceError::PreconditionFailed(format!(
                "receiving order {} has no lines",
                order.code
            )));
        }

        let now = Utc::now();
        let reference = DocumentRef::new(RECEIVING_REFERENCE_TABLE, order_id);
        let task = putaway_task::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(order.warehouse_id),
            receiving_order_id: Set(order_id),
            from_location_id: Set(staging.id),
            status: Set(PutawayStatus::Open),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(None),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut lots = Vec::new();
        let mut posted_items = Vec::with_capacity(items.len());
        let mut putaway_items = Vec::with_capacity(items.len());
        for item in items {
            let lot = match &item.lot_number {
                Some(lot_number) => Some(resolve_lot(&txn, &item, lot_number, order_id, now).await?),
                None => None,
            };
            let lot_id = lot.as_ref().map(|l| l.id);
            if let Some(lot) = lot {
                if !lots.iter().any(|l: &inventory_lot::Model| l.id == lot.id) {
                    lots.push(lot);
                }
            }

            let key = LedgerKey::new(order.warehouse_id, item.sku_id, lot_id, staging.id);
            ledger::apply_movement(
                &txn,
                key,
                item.received_qty,
                TransactionType::Receive,
                reference,
                actor,
            )
            .await?;

            putaway_items.push(
                putaway_task_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    task_id: Set(task.id),
                    receiving_item_id: Set(Some(item.id)),
                    sku_id: Set(item.sku_id),
                    lot_id: Set(lot_id),
                    quantity: Set(item.received_qty),
                    putaway_qty: Set(0),
                    suggested_location_id: Set(staging.id),
                    actual_location_id: Set(None),
                }
                .insert(&txn)
                .await?,
            );

            let mut active: receiving_item::ActiveModel = item.into();
            active.lot_id = Set(lot_id);
            posted_items.push(active.update(&txn).await?);
        }

        let mut active: receiving_order::ActiveModel = order.into();
        active.status = Set(ReceivingStatus::Posted);
        active.posted_by = Set(Some(actor.user_id));
        active.posted_at = Set(Some(now));
        let order = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            receiving_order_id = %order_id,
            putaway_task_id = %task.id,
            lines = posted_items.len(),
            "Receiving order posted"
        );
        self.event_sender
            .emit(Event::ReceivingPosted {
                receiving_order_id: order_id,
                putaway_task_id: task.id,
                posted_at: now,
            })
            .await;

        Ok(PostingOutcome {
            order: ReceivingOrderView {
                order,
                items: posted_items,
            },
            lots,
            putaway_task: task,
            putaway_items,
        })
    }

    pub async fn get(&self, order_id: Uuid) -> Result<ReceivingOrderView, ServiceError> {
        let db = &*self.db;
        let order = find_order(db, order_id, false).await?;
        let items = order_items(db, order_id).await?;
        Ok(ReceivingOrderView { order, items })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ReceivingFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<receiving_order::Model>, ServiceError> {
        let page = page.clamped(self.max_page_size);
        let mut query = ReceivingOrder::find();
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(receiving_order::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(receiving_order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(receiving_order::Column::CreatedAt)
            .paginate(&*self.db, page.limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.page - 1).await?;
        Ok(PaginatedResponse::new(orders, total, page))
    }

    async fn advance(
        &self,
        order_id: Uuid,
        target: ReceivingStatus,
        actor: &Actor,
    ) -> Result<receiving_order::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id, true).await?;
        expect_status(&order, target)?;

        let now = Some(Utc::now());
        let mut active: receiving_order::ActiveModel = order.into();
        active.status = Set(target);
        match target {
            ReceivingStatus::Submitted => active.submitted_at = Set(now),
            ReceivingStatus::Approved => {
                active.approved_by = Set(Some(actor.user_id));
                active.approved_at = Set(now);
            }
            ReceivingStatus::Draft | ReceivingStatus::Posted => {}
        }
        let order = active.update(&txn).await?;
        txn.commit().await?;

        info!(receiving_order_id = %order_id, status = %target, "Receiving order advanced");
        Ok(order)
    }
}

/// `target` must be the immediate successor of the order's current status.
fn expect_status(order: &receiving_order::Model, target: ReceivingStatus) -> Result<(), ServiceError> {
    if order.status.next() == Some(target) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "receiving order {} is {} and cannot move to {}",
            order.code, order.status, target
        )))
    }
}

async fn resolve_lot<C: ConnectionTrait>(
    conn: &C,
    item: &receiving_item::Model,
    lot_number: &str,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<inventory_lot::Model, ServiceError> {
    let existing = InventoryLot::find()
        .filter(inventory_lot::Column::SkuId.eq(item.sku_id))
        .filter(inventory_lot::Column::LotNumber.eq(lot_number))
        .one(conn)
        .await?;
    if let Some(lot) = existing {
        return Ok(lot);
    }
    Ok(inventory_lot::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku_id: Set(item.sku_id),
        lot_number: Set(lot_number.to_string()),
        manufactured_on: Set(item.manufactured_on),
        expires_on: Set(item.expires_on),
        receiving_order_id: Set(Some(order_id)),
        created_at: Set(now),
    }
    .insert(conn)
    .await?)
}

async fn next_code<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let day = now.date_naive();
    let (start, end) = day_bounds(day);
    let created_today = ReceivingOrder::find()
        .filter(receiving_order::Column::WarehouseId.eq(warehouse_id))
        .filter(receiving_order::Column::CreatedAt.gte(start))
        .filter(receiving_order::Column::CreatedAt.lt(end))
        .count(conn)
        .await?;
    Ok(format_document_code(RECEIVING_PREFIX, day, created_today + 1))
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    for_update: bool,
) -> Result<receiving_order::Model, ServiceError> {
    let mut query = ReceivingOrder::find_by_id(order_id);
    if for_update {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Receiving order {} not found", order_id)))
}

async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<receiving_item::Model>, ServiceError> {
    Ok(ReceivingItem::find()
        .filter(receiving_item::Column::ReceivingOrderId.eq(order_id))
        .order_by_asc(receiving_item::Column::LineNo)
        .all(conn)
        .await?)
}
