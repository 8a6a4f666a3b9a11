//! Outbound document state machine for sales orders and internal transfers.
//!
//! ```text
//! DRAFT ──submit──▶ PENDING_APPROVAL ──approve──▶ APPROVED
//!   │                     └──────reject──────▶ REJECTED
//!   └──submit (transfer)──────────────────────▶ APPROVED
//! DRAFT | PENDING_APPROVAL | APPROVED ──cancel──▶ CANCELLED
//! ```
//!
//! Stock shortfalls are advisory while drafting and blocking at submit and
//! approval. Reservations are taken in the same unit of work as the status
//! change that requires them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, Permission, SYSTEM_USER_ID};
use crate::entities::outbound::{OutboundKind, OutboundStatus, RejectionCode};
use crate::entities::reservation;
use crate::entities::sales_order::{self, Entity as SalesOrder};
use crate::entities::sales_order_item::{self, Entity as SalesOrderItem};
use crate::entities::transfer::{self, Entity as Transfer};
use crate::entities::transfer_item::{self, Entity as TransferItem};
use crate::errors::{ServiceError, StockShortage};
use crate::events::{Event, EventSender};
use crate::services::documents::{
    day_bounds, ensure_active_skus, format_document_code, map_code_conflict,
};
use crate::services::ledger::{self, DocumentRef, StockLevel};
use crate::services::reservations::{self, ReservationLine};
use crate::{PageRequest, PaginatedResponse};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct OutboundLineInput {
    pub sku_id: Uuid,
    #[validate(custom = "ledger::validate_positive_quantity")]
    pub quantity: i64,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

/// Variant-specific header fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundDetails {
    SalesOrder {
        customer_id: Uuid,
        delivery_date: NaiveDate,
    },
    InternalTransfer {
        destination_warehouse_id: Uuid,
        transfer_date: NaiveDate,
        receiver_name: String,
        receiver_phone: Option<String>,
    },
}

impl OutboundDetails {
    pub fn kind(&self) -> OutboundKind {
        match self {
            OutboundDetails::SalesOrder { .. } => OutboundKind::SalesOrder,
            OutboundDetails::InternalTransfer { .. } => OutboundKind::InternalTransfer,
        }
    }

    fn validate_for(&self, warehouse_id: Uuid, today: NaiveDate) -> Result<(), ServiceError> {
        let date = match self {
            OutboundDetails::SalesOrder { delivery_date, .. } => *delivery_date,
            OutboundDetails::InternalTransfer {
                destination_warehouse_id,
                transfer_date,
                receiver_name,
                ..
            } => {
                if *destination_warehouse_id == warehouse_id {
                    return Err(ServiceError::ValidationError(
                        "destination warehouse must differ from the source warehouse".to_string(),
                    ));
                }
                if receiver_name.trim().is_empty() {
                    return Err(ServiceError::ValidationError(
                        "receiver name is required".to_string(),
                    ));
                }
                *transfer_date
            }
        };
        if date < today {
            return Err(ServiceError::DateViolation(format!(
                "{} is in the past (today is {})",
                date, today
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateOutboundRequest {
    pub warehouse_id: Uuid,
    #[serde(flatten)]
    pub details: OutboundDetails,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<OutboundLineInput>,
}

/// Draft edit; `items` replaces the whole line set.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateOutboundRequest {
    pub details: Option<OutboundDetails>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<OutboundLineInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approve,
    Reject { code: RejectionCode, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundHeader {
    SalesOrder(sales_order::Model),
    InternalTransfer(transfer::Model),
}

impl OutboundHeader {
    pub fn kind(&self) -> OutboundKind {
        match self {
            OutboundHeader::SalesOrder(_) => OutboundKind::SalesOrder,
            OutboundHeader::InternalTransfer(_) => OutboundKind::InternalTransfer,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            OutboundHeader::SalesOrder(m) => m.id,
            OutboundHeader::InternalTransfer(m) => m.id,
        }
    }

    pub fn warehouse_id(&self) -> Uuid {
        match self {
            OutboundHeader::SalesOrder(m) => m.warehouse_id,
            OutboundHeader::InternalTransfer(m) => m.warehouse_id,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            OutboundHeader::SalesOrder(m) => &m.code,
            OutboundHeader::InternalTransfer(m) => &m.code,
        }
    }

    pub fn status(&self) -> OutboundStatus {
        match self {
            OutboundHeader::SalesOrder(m) => m.status,
            OutboundHeader::InternalTransfer(m) => m.status,
        }
    }

    pub fn created_by(&self) -> Uuid {
        match self {
            OutboundHeader::SalesOrder(m) => m.created_by,
            OutboundHeader::InternalTransfer(m) => m.created_by,
        }
    }

    pub fn reference(&self) -> DocumentRef {
        DocumentRef::new(self.kind().reference_table(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundItem {
    pub line_no: i32,
    pub sku_id: Uuid,
    pub quantity: i64,
    pub note: Option<String>,
}

impl From<sales_order_item::Model> for OutboundItem {
    fn from(m: sales_order_item::Model) -> Self {
        Self {
            line_no: m.line_no,
            sku_id: m.sku_id,
            quantity: m.quantity,
            note: m.note,
        }
    }
}

impl From<transfer_item::Model> for OutboundItem {
    fn from(m: transfer_item::Model) -> Self {
        Self {
            line_no: m.line_no,
            sku_id: m.sku_id,
            quantity: m.quantity,
            note: m.note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundDocument {
    pub header: OutboundHeader,
    pub items: Vec<OutboundItem>,
}

/// Result of create/update: the draft plus advisory shortfalls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftOutcome {
    pub document: OutboundDocument,
    pub warnings: Vec<StockShortage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub document: OutboundDocument,
    pub reservations: Vec<reservation::Model>,
}

/// Real-time stock for one aggregated line at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStock {
    pub sku_id: Uuid,
    pub requested: i64,
    pub on_hand: i64,
    pub reserved: i64,
    pub available: i64,
}

impl LineStock {
    fn new(sku_id: Uuid, requested: i64, level: StockLevel) -> Self {
        Self {
            sku_id,
            requested,
            on_hand: level.on_hand,
            reserved: level.reserved,
            available: level.available,
        }
    }

    pub fn would_go_negative(&self) -> bool {
        self.available - self.requested < 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub document: OutboundDocument,
    pub stock: Vec<LineStock>,
    pub negative_warnings: Vec<StockShortage>,
    pub reservations: Vec<reservation::Model>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutboundFilter {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<OutboundStatus>,
}

/// Sums quantities per sku, keeping first-seen order.
pub fn aggregate_lines(items: &[OutboundItem]) -> Result<Vec<(Uuid, i64)>, ServiceError> {
    let mut order: Vec<(Uuid, i64)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for item in items {
        match index.get(&item.sku_id) {
            Some(&i) => {
                order[i].1 = order[i].1.checked_add(item.quantity).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "combined quantity for sku {} is out of range",
                        item.sku_id
                    ))
                })?;
            }
            None => {
                index.insert(item.sku_id, order.len());
                order.push((item.sku_id, item.quantity));
            }
        }
    }
    Ok(order)
}

fn shortages(lines: &[LineStock]) -> Vec<StockShortage> {
    lines
        .iter()
        .filter(|l| l.would_go_negative())
        .map(|l| StockShortage {
            sku_id: l.sku_id,
            available: l.available,
            requested: l.requested,
        })
        .collect()
}

/// Per-sku stock for the aggregated lines of a document.
pub async fn line_stock<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    items: &[OutboundItem],
) -> Result<Vec<LineStock>, ServiceError> {
    let aggregated = aggregate_lines(items)?;
    let sku_ids: Vec<Uuid> = aggregated.iter().map(|(sku, _)| *sku).collect();
    let levels = ledger::stock_levels(conn, warehouse_id, &sku_ids).await?;
    Ok(aggregated
        .into_iter()
        .map(|(sku_id, requested)| {
            LineStock::new(
                sku_id,
                requested,
                levels.get(&sku_id).copied().unwrap_or_default(),
            )
        })
        .collect())
}

/// Hard gate: fails with every short line when any line cannot be covered.
pub async fn validate_sufficient_stock<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    items: &[OutboundItem],
) -> Result<Vec<LineStock>, ServiceError> {
    let stock = line_stock(conn, warehouse_id, items).await?;
    let short = shortages(&stock);
    if short.is_empty() {
        Ok(stock)
    } else {
        Err(ServiceError::InsufficientStock(short))
    }
}

#[derive(Clone)]
pub struct OutboundService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    rejection_reason_min_length: usize,
    max_page_size: u64,
}

impl OutboundService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        rejection_reason_min_length: usize,
        max_page_size: u64,
    ) -> Self {
        Self {
            db,
            event_sender,
            rejection_reason_min_length,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(warehouse_id = %request.warehouse_id, kind = %request.details.kind()))]
    pub async fn create(
        &self,
        request: CreateOutboundRequest,
        actor: &Actor,
    ) -> Result<DraftOutcome, ServiceError> {
        actor.require(Permission::CreateOutbound)?;
        request.validate()?;
        let now = Utc::now();
        request.details.validate_for(request.warehouse_id, now.date_naive())?;

        let txn = self.db.begin().await?;
        ensure_active_skus(&txn, &line_skus(&request.items)).await?;

        let kind = request.details.kind();
        let code = next_code(&txn, kind, request.warehouse_id, now).await?;
        let id = Uuid::new_v4();

        let header = match request.details {
            OutboundDetails::SalesOrder {
                customer_id,
                delivery_date,
            } => OutboundHeader::SalesOrder(
                sales_order::ActiveModel {
                    id: Set(id),
                    warehouse_id: Set(request.warehouse_id),
                    code: Set(code.clone()),
                    status: Set(OutboundStatus::Draft),
                    customer_id: Set(customer_id),
                    delivery_date: Set(delivery_date),
                    notes: Set(request.notes),
                    created_by: Set(actor.user_id),
                    created_at: Set(now),
                    updated_at: Set(None),
                    submitted_at: Set(None),
                    approved_by: Set(None),
                    approved_at: Set(None),
                    rejection_code: Set(None),
                    rejection_reason: Set(None),
                    cancelled_at: Set(None),
                }
                .insert(&txn)
                .await
                .map_err(|e| map_code_conflict(e, &code))?,
            ),
            OutboundDetails::InternalTransfer {
                destination_warehouse_id,
                transfer_date,
                receiver_name,
                receiver_phone,
            } => OutboundHeader::InternalTransfer(
                transfer::ActiveModel {
                    id: Set(id),
                    warehouse_id: Set(request.warehouse_id),
                    code: Set(code.clone()),
                    status: Set(OutboundStatus::Draft),
                    destination_warehouse_id: Set(destination_warehouse_id),
                    transfer_date: Set(transfer_date),
                    receiver_name: Set(receiver_name.trim().to_string()),
                    receiver_phone: Set(receiver_phone),
                    notes: Set(request.notes),
                    created_by: Set(actor.user_id),
                    created_at: Set(now),
                    updated_at: Set(None),
                    submitted_at: Set(None),
                    approved_by: Set(None),
                    approved_at: Set(None),
                    cancelled_at: Set(None),
                }
                .insert(&txn)
                .await
                .map_err(|e| map_code_conflict(e, &code))?,
            ),
        };

        let items = replace_items(&txn, kind, id, &request.items).await?;
        let warnings = shortages(&line_stock(&txn, header.warehouse_id(), &items).await?);
        txn.commit().await?;

        info!(document_id = %id, code = %code, warnings = warnings.len(), "Outbound document created");
        Ok(DraftOutcome {
            document: OutboundDocument { header, items },
            warnings,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        kind: OutboundKind,
        document_id: Uuid,
        request: UpdateOutboundRequest,
        actor: &Actor,
    ) -> Result<DraftOutcome, ServiceError> {
        actor.require(Permission::CreateOutbound)?;
        request.validate()?;

        let txn = self.db.begin().await?;
        let header = load_header(&txn, kind, document_id, true).await?;
        ensure_editable_draft(&header, actor)?;
        ensure_active_skus(&txn, &line_skus(&request.items)).await?;

        let now = Utc::now();
        if let Some(details) = &request.details {
            if details.kind() != kind {
                return Err(ServiceError::ValidationError(format!(
                    "cannot change a {} into a {}",
                    kind,
                    details.kind()
                )));
            }
            details.validate_for(header.warehouse_id(), now.date_naive())?;
        }

        let header = match header {
            OutboundHeader::SalesOrder(model) => {
                let mut active: sales_order::ActiveModel = model.into();
                if let Some(OutboundDetails::SalesOrder {
                    customer_id,
                    delivery_date,
                }) = request.details
                {
                    active.customer_id = Set(customer_id);
                    active.delivery_date = Set(delivery_date);
                }
                if request.notes.is_some() {
                    active.notes = Set(request.notes.clone());
                }
                active.updated_at = Set(Some(now));
                OutboundHeader::SalesOrder(active.update(&txn).await?)
            }
            OutboundHeader::InternalTransfer(model) => {
                let mut active: transfer::ActiveModel = model.into();
                if let Some(OutboundDetails::InternalTransfer {
                    destination_warehouse_id,
                    transfer_date,
                    receiver_name,
                    receiver_phone,
                }) = request.details
                {
                    active.destination_warehouse_id = Set(destination_warehouse_id);
                    active.transfer_date = Set(transfer_date);
                    active.receiver_name = Set(receiver_name.trim().to_string());
                    active.receiver_phone = Set(receiver_phone);
                }
                if request.notes.is_some() {
                    active.notes = Set(request.notes.clone());
                }
                active.updated_at = Set(Some(now));
                OutboundHeader::InternalTransfer(active.update(&txn).await?)
            }
        };

        let items = replace_items(&txn, kind, document_id, &request.items).await?;
        let warnings = shortages(&line_stock(&txn, header.warehouse_id(), &items).await?);
        txn.commit().await?;

        info!(document_id = %document_id, warnings = warnings.len(), "Outbound draft updated");
        Ok(DraftOutcome {
            document: OutboundDocument { header, items },
            warnings,
        })
    }

    /// Submits a draft. Transfers are approved and reserved in the same unit of work.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        kind: OutboundKind,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<SubmitOutcome, ServiceError> {
        actor.require(Permission::CreateOutbound)?;

        let txn = self.db.begin().await?;
        let header = load_header(&txn, kind, document_id, true).await?;
        ensure_editable_draft(&header, actor)?;

        let items = load_items(&txn, kind, document_id).await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "{} has no line items",
                header.code()
            )));
        }
        if let Err(err) = validate_sufficient_stock(&txn, header.warehouse_id(), &items).await {
            warn!(document_id = %document_id, error = %err, "Submission blocked");
            return Err(err);
        }

        let now = Utc::now();
        let (header, reservations) = match kind {
            OutboundKind::SalesOrder => {
                let header = apply_transition(
                    &txn,
                    header,
                    Transition::new(OutboundStatus::PendingApproval, now).submitted(),
                )
                .await?;
                (header, Vec::new())
            }
            OutboundKind::InternalTransfer => {
                let reservations = reservations::reserve_in(
                    &txn,
                    header.warehouse_id(),
                    &reservation_lines(&items),
                    header.reference(),
                    &Actor::system(),
                )
                .await?;
                let header = apply_transition(
                    &txn,
                    header,
                    Transition::new(OutboundStatus::Approved, now)
                        .submitted()
                        .approved_by(SYSTEM_USER_ID),
                )
                .await?;
                (header, reservations)
            }
        };
        txn.commit().await?;

        info!(document_id = %document_id, status = %header.status(), "Outbound document submitted");
        self.event_sender
            .emit(Event::OutboundSubmitted {
                kind,
                document_id,
                code: header.code().to_string(),
            })
            .await;
        if header.status() == OutboundStatus::Approved {
            self.announce_approval(&header, SYSTEM_USER_ID, &reservations)
                .await;
        }

        Ok(SubmitOutcome {
            document: OutboundDocument { header, items },
            reservations,
        })
    }

    /// Manager decision on a pending sales order.
    #[instrument(skip(self, decision))]
    pub async fn approve(
        &self,
        sales_order_id: Uuid,
        decision: ApprovalDecision,
        actor: &Actor,
    ) -> Result<ApprovalOutcome, ServiceError> {
        actor.require(Permission::ApproveOutbound)?;
        if let ApprovalDecision::Reject { reason, .. } = &decision {
            let length = reason.trim().chars().count();
            if length < self.rejection_reason_min_length {
                return Err(ServiceError::ValidationError(format!(
                    "rejection reason must be at least {} characters",
                    self.rejection_reason_min_length
                )));
            }
        }

        let txn = self.db.begin().await?;
        let header = load_header(&txn, OutboundKind::SalesOrder, sales_order_id, true).await?;
        if header.status() != OutboundStatus::PendingApproval {
            return Err(ServiceError::InvalidTransition(format!(
                "{} is {}, expected {}",
                header.code(),
                header.status(),
                OutboundStatus::PendingApproval
            )));
        }

        let items = load_items(&txn, OutboundKind::SalesOrder, sales_order_id).await?;
        let stock = line_stock(&txn, header.warehouse_id(), &items).await?;
        let negative_warnings = shortages(&stock);
        let now = Utc::now();

        let (header, reservations) = match decision {
            ApprovalDecision::Approve => {
                validate_sufficient_stock(&txn, header.warehouse_id(), &items).await?;
                let reservations = reservations::reserve_in(
                    &txn,
                    header.warehouse_id(),
                    &reservation_lines(&items),
                    header.reference(),
                    actor,
                )
                .await?;
                let header = apply_transition(
                    &txn,
                    header,
                    Transition::new(OutboundStatus::Approved, now).approved_by(actor.user_id),
                )
                .await?;
                (header, reservations)
            }
            ApprovalDecision::Reject { code, reason } => {
                let header = apply_transition(
                    &txn,
                    header,
                    Transition::new(OutboundStatus::Rejected, now)
                        .rejected(code, reason.trim().to_string()),
                )
                .await?;
                (header, Vec::new())
            }
        };
        txn.commit().await?;

        if header.status() == OutboundStatus::Approved {
            self.announce_approval(&header, actor.user_id, &reservations)
                .await;
        } else {
            info!(document_id = %sales_order_id, "Sales order rejected");
            self.event_sender
                .emit(Event::OutboundRejected {
                    kind: OutboundKind::SalesOrder,
                    document_id: sales_order_id,
                    code: header.code().to_string(),
                })
                .await;
        }

        Ok(ApprovalOutcome {
            document: OutboundDocument { header, items },
            stock,
            negative_warnings,
            reservations,
        })
    }

    /// Cancels an open document; approved documents give their reservations back.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        kind: OutboundKind,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<OutboundDocument, ServiceError> {
        let txn = self.db.begin().await?;
        let header = load_header(&txn, kind, document_id, true).await?;

        let is_creator = header.created_by() == actor.user_id
            && actor.role.grants(Permission::CreateOutbound);
        if !is_creator && !actor.role.grants(Permission::ApproveOutbound) {
            return Err(ServiceError::Forbidden(format!(
                "only the creator or a manager may cancel {}",
                header.code()
            )));
        }
        if !header.status().can_transition_to(OutboundStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition(format!(
                "{} is {} and cannot be cancelled",
                header.code(),
                header.status()
            )));
        }

        let released = if header.status() == OutboundStatus::Approved {
            reservations::release_in(&txn, header.reference(), actor).await?
        } else {
            reservations::ReleaseSummary {
                released: Vec::new(),
                total_quantity: 0,
            }
        };
        let header = apply_transition(
            &txn,
            header,
            Transition::new(OutboundStatus::Cancelled, Utc::now()),
        )
        .await?;
        let items = load_items(&txn, kind, document_id).await?;
        txn.commit().await?;

        info!(document_id = %document_id, released = released.total_quantity, "Outbound document cancelled");
        self.event_sender
            .emit(Event::OutboundCancelled {
                kind,
                document_id,
                code: header.code().to_string(),
            })
            .await;
        if !released.released.is_empty() {
            self.event_sender
                .emit(Event::InventoryReleased {
                    warehouse_id: header.warehouse_id(),
                    reference_table: kind.reference_table().to_string(),
                    reference_id: document_id,
                    total_quantity: released.total_quantity,
                })
                .await;
        }
        Ok(OutboundDocument { header, items })
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        kind: OutboundKind,
        document_id: Uuid,
    ) -> Result<OutboundDocument, ServiceError> {
        let db = &*self.db;
        let header = load_header(db, kind, document_id, false).await?;
        let items = load_items(db, kind, document_id).await?;
        Ok(OutboundDocument { header, items })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        kind: OutboundKind,
        filter: OutboundFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<OutboundHeader>, ServiceError> {
        let db = &*self.db;
        let page = page.clamped(self.max_page_size);
        match kind {
            OutboundKind::SalesOrder => {
                let mut query = SalesOrder::find();
                if let Some(warehouse_id) = filter.warehouse_id {
                    query = query.filter(sales_order::Column::WarehouseId.eq(warehouse_id));
                }
                if let Some(status) = filter.status {
                    query = query.filter(sales_order::Column::Status.eq(status));
                }
                let paginator = query
                    .order_by_desc(sales_order::Column::CreatedAt)
                    .paginate(db, page.limit);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.page - 1).await?;
                Ok(PaginatedResponse::new(
                    rows.into_iter().map(OutboundHeader::SalesOrder).collect(),
                    total,
                    page,
                ))
            }
            OutboundKind::InternalTransfer => {
                let mut query = Transfer::find();
                if let Some(warehouse_id) = filter.warehouse_id {
                    query = query.filter(transfer::Column::WarehouseId.eq(warehouse_id));
                }
                if let Some(status) = filter.status {
                    query = query.filter(transfer::Column::Status.eq(status));
                }
                let paginator = query
                    .order_by_desc(transfer::Column::CreatedAt)
                    .paginate(db, page.limit);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.page - 1).await?;
                Ok(PaginatedResponse::new(
                    rows.into_iter()
                        .map(OutboundHeader::InternalTransfer)
                        .collect(),
                    total,
                    page,
                ))
            }
        }
    }

    async fn announce_approval(
        &self,
        header: &OutboundHeader,
        approved_by: Uuid,
        reservations: &[reservation::Model],
    ) {
        info!(document_id = %header.id(), approved_by = %approved_by, "Outbound document approved");
        self.event_sender
            .emit(Event::OutboundApproved {
                kind: header.kind(),
                document_id: header.id(),
                code: header.code().to_string(),
                approved_by,
            })
            .await;
        self.event_sender
            .emit(Event::InventoryReserved {
                warehouse_id: header.warehouse_id(),
                reference_table: header.kind().reference_table().to_string(),
                reference_id: header.id(),
                total_quantity: reservations.iter().map(|r| r.quantity).sum(),
            })
            .await;
    }
}

fn ensure_editable_draft(header: &OutboundHeader, actor: &Actor) -> Result<(), ServiceError> {
    if header.created_by() != actor.user_id {
        return Err(ServiceError::Forbidden(format!(
            "only the creator may change {}",
            header.code()
        )));
    }
    if header.status() != OutboundStatus::Draft {
        return Err(ServiceError::PreconditionFailed(format!(
            "{} is {} and no longer editable",
            header.code(),
            header.status()
        )));
    }
    Ok(())
}

fn line_skus(items: &[OutboundLineInput]) -> Vec<Uuid> {
    items.iter().map(|i| i.sku_id).collect()
}

fn reservation_lines(items: &[OutboundItem]) -> Vec<ReservationLine> {
    items
        .iter()
        .map(|i| ReservationLine {
            sku_id: i.sku_id,
            quantity: i.quantity,
        })
        .collect()
}

async fn next_code<C: ConnectionTrait>(
    conn: &C,
    kind: OutboundKind,
    warehouse_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let day = now.date_naive();
    let (start, end) = day_bounds(day);
    let created_today = match kind {
        OutboundKind::SalesOrder => {
            SalesOrder::find()
                .filter(sales_order::Column::WarehouseId.eq(warehouse_id))
                .filter(sales_order::Column::CreatedAt.gte(start))
                .filter(sales_order::Column::CreatedAt.lt(end))
                .count(conn)
                .await?
        }
        OutboundKind::InternalTransfer => {
            Transfer::find()
                .filter(transfer::Column::WarehouseId.eq(warehouse_id))
                .filter(transfer::Column::CreatedAt.gte(start))
                .filter(transfer::Column::CreatedAt.lt(end))
                .count(conn)
                .await?
        }
    };
    Ok(format_document_code(kind.code_prefix(), day, created_today + 1))
}

async fn load_header<C: ConnectionTrait>(
    conn: &C,
    kind: OutboundKind,
    document_id: Uuid,
    for_update: bool,
) -> Result<OutboundHeader, ServiceError> {
    let not_found = || ServiceError::NotFound(format!("{} {} not found", kind, document_id));
    match kind {
        OutboundKind::SalesOrder => {
            let mut query = SalesOrder::find_by_id(document_id);
            if for_update {
                query = query.lock_exclusive();
            }
            query
                .one(conn)
                .await?
                .map(OutboundHeader::SalesOrder)
                .ok_or_else(not_found)
        }
        OutboundKind::InternalTransfer => {
            let mut query = Transfer::find_by_id(document_id);
            if for_update {
                query = query.lock_exclusive();
            }
            query
                .one(conn)
                .await?
                .map(OutboundHeader::InternalTransfer)
                .ok_or_else(not_found)
        }
    }
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    kind: OutboundKind,
    document_id: Uuid,
) -> Result<Vec<OutboundItem>, ServiceError> {
    Ok(match kind {
        OutboundKind::SalesOrder => SalesOrderItem::find()
            .filter(sales_order_item::Column::SalesOrderId.eq(document_id))
            .order_by_asc(sales_order_item::Column::LineNo)
            .all(conn)
            .await?
            .into_iter()
            .map(OutboundItem::from)
            .collect(),
        OutboundKind::InternalTransfer => TransferItem::find()
            .filter(transfer_item::Column::TransferId.eq(document_id))
            .order_by_asc(transfer_item::Column::LineNo)
            .all(conn)
            .await?
            .into_iter()
            .map(OutboundItem::from)
            .collect(),
    })
}

async fn replace_items<C: ConnectionTrait>(
    conn: &C,
    kind: OutboundKind,
    document_id: Uuid,
    lines: &[OutboundLineInput],
) -> Result<Vec<OutboundItem>, ServiceError> {
    let items: Vec<OutboundItem> = lines
        .iter()
        .zip(1..)
        .map(|(line, line_no)| OutboundItem {
            line_no,
            sku_id: line.sku_id,
            quantity: line.quantity,
            note: line.note.clone(),
        })
        .collect();

    match kind {
        OutboundKind::SalesOrder => {
            SalesOrderItem::delete_many()
                .filter(sales_order_item::Column::SalesOrderId.eq(document_id))
                .exec(conn)
                .await?;
            let rows = items.iter().map(|item| sales_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sales_order_id: Set(document_id),
                line_no: Set(item.line_no),
                sku_id: Set(item.sku_id),
                quantity: Set(item.quantity),
                note: Set(item.note.clone()),
            });
            SalesOrderItem::insert_many(rows)
                .exec_without_returning(conn)
                .await?;
        }
        OutboundKind::InternalTransfer => {
            TransferItem::delete_many()
                .filter(transfer_item::Column::TransferId.eq(document_id))
                .exec(conn)
                .await?;
            let rows = items.iter().map(|item| transfer_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(document_id),
                line_no: Set(item.line_no),
                sku_id: Set(item.sku_id),
                quantity: Set(item.quantity),
                note: Set(item.note.clone()),
            });
            TransferItem::insert_many(rows)
                .exec_without_returning(conn)
                .await?;
        }
    }
    Ok(items)
}

/// Header stamps written alongside a status change.
struct Transition {
    status: OutboundStatus,
    at: DateTime<Utc>,
    submitted: bool,
    approved_by: Option<Uuid>,
    rejection: Option<(RejectionCode, String)>,
}

impl Transition {
    fn new(status: OutboundStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            at,
            submitted: false,
            approved_by: None,
            rejection: None,
        }
    }

    fn submitted(mut self) -> Self {
        self.submitted = true;
        self
    }

    fn approved_by(mut self, user_id: Uuid) -> Self {
        self.approved_by = Some(user_id);
        self
    }

    fn rejected(mut self, code: RejectionCode, reason: String) -> Self {
        self.rejection = Some((code, reason));
        self
    }
}

async fn apply_transition<C: ConnectionTrait>(
    conn: &C,
    header: OutboundHeader,
    transition: Transition,
) -> Result<OutboundHeader, ServiceError> {
    if !header.status().can_transition_to(transition.status) {
        return Err(ServiceError::InvalidTransition(format!(
            "{} cannot move from {} to {}",
            header.code(),
            header.status(),
            transition.status
        )));
    }
    let at = Some(transition.at);
    let cancelled = transition.status == OutboundStatus::Cancelled;

    match header {
        OutboundHeader::SalesOrder(model) => {
            let mut active: sales_order::ActiveModel = model.into();
            active.status = Set(transition.status);
            active.updated_at = Set(at);
            if transition.submitted {
                active.submitted_at = Set(at);
            }
            if let Some(approver) = transition.approved_by {
                active.approved_by = Set(Some(approver));
                active.approved_at = Set(at);
            }
            if let Some((code, reason)) = transition.rejection {
                active.rejection_code = Set(Some(code));
                active.rejection_reason = Set(Some(reason));
            }
            if cancelled {
                active.cancelled_at = Set(at);
            }
            Ok(OutboundHeader::SalesOrder(active.update(conn).await?))
        }
        OutboundHeader::InternalTransfer(model) => {
            let mut active: transfer::ActiveModel = model.into();
            active.status = Set(transition.status);
            active.updated_at = Set(at);
            if transition.submitted {
                active.submitted_at = Set(at);
            }
            if let Some(approver) = transition.approved_by {
                active.approved_by = Set(Some(approver));
                active.approved_at = Set(at);
            }
            if cancelled {
                active.cancelled_at = Set(at);
            }
            Ok(OutboundHeader::InternalTransfer(active.update(conn).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn item(sku_id: Uuid, quantity: i64) -> OutboundItem {
        OutboundItem {
            line_no: 0,
            sku_id,
            quantity,
            note: None,
        }
    }

    #[test]
    fn duplicate_skus_are_aggregated_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = aggregate_lines(&[item(a, 5), item(b, 1), item(a, 7)]).unwrap();
        assert_eq!(lines, vec![(a, 12), (b, 1)]);
    }

    #[test]
    fn overflowing_duplicate_lines_are_rejected() {
        let a = Uuid::new_v4();
        assert_matches!(
            aggregate_lines(&[item(a, i64::MAX), item(a, i64::MAX)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn transfer_to_same_warehouse_is_invalid() {
        let warehouse = Uuid::new_v4();
        let today = Utc::now().date_naive();
        let details = OutboundDetails::InternalTransfer {
            destination_warehouse_id: warehouse,
            transfer_date: today,
            receiver_name: "Dock 4".into(),
            receiver_phone: None,
        };
        assert_matches!(
            details.validate_for(warehouse, today),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn past_delivery_date_is_a_date_violation() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let details = OutboundDetails::SalesOrder {
            customer_id: Uuid::new_v4(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
        };
        assert_matches!(
            details.validate_for(Uuid::new_v4(), today),
            Err(ServiceError::DateViolation(_))
        );

        let same_day = OutboundDetails::SalesOrder {
            customer_id: Uuid::new_v4(),
            delivery_date: today,
        };
        assert!(same_day.validate_for(Uuid::new_v4(), today).is_ok());
    }

    #[test]
    fn shortages_only_list_negative_lines() {
        let short = Uuid::new_v4();
        let stock = vec![
            LineStock::new(short, 50, StockLevel::from_totals(30, 0)),
            LineStock::new(Uuid::new_v4(), 10, StockLevel::from_totals(40, 30)),
        ];
        let lines = shortages(&stock);
        assert_eq!(
            lines,
            vec![StockShortage {
                sku_id: short,
                available: 30,
                requested: 50
            }]
        );
    }

    #[test]
    fn decisions_deserialize_from_tagged_json() {
        let reject: ApprovalDecision = serde_json::from_value(serde_json::json!({
            "decision": "REJECT",
            "code": "PRICING_ERROR",
            "reason": "Price list expired last week"
        }))
        .unwrap();
        assert_matches!(
            reject,
            ApprovalDecision::Reject { code: RejectionCode::PricingError, .. }
        );
    }
}
