//! Putaway placement advisor and task executor.
//!
//! The advisor routes a sku to the zone named after its category
//! (`Z-<category code>`) and picks the bin there with the most room left.
//! The executor moves confirmed quantities from the task's staging location
//! into the chosen bins.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, Permission};
use crate::entities::category::Entity as Category;
use crate::entities::location::{self, LocationType};
use crate::entities::putaway_task::{self, Entity as PutawayTask, PutawayStatus};
use crate::entities::putaway_task_item::{self, Entity as PutawayTaskItem};
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::sku::Entity as Sku;
use crate::entities::zone::{self, Entity as Zone};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{self, DocumentRef, LedgerKey};
use crate::services::locations;
use crate::{PageRequest, PaginatedResponse};

pub const PUTAWAY_REFERENCE_TABLE: &str = "putaway_tasks";

/// Zone code a category's stock is routed to.
pub fn zone_code_for_category(category_code: &str) -> String {
    format!("Z-{}", category_code)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutawaySuggestion {
    pub sku_id: Uuid,
    pub quantity: i64,
    pub zone_id: Uuid,
    pub zone_code: String,
    pub location_id: Uuid,
    pub location_code: String,
    pub rack_code: Option<String>,
    pub aisle_code: Option<String>,
    pub residual_capacity: i64,
    pub reason: String,
}

/// Recommends a bin for `quantity` units of `sku_id`, or `None` when no
/// convention zone or no bin with enough room exists.
#[instrument(skip(conn))]
pub async fn suggest_location<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    sku_id: Uuid,
    quantity: i64,
) -> Result<Option<PutawaySuggestion>, ServiceError> {
    if quantity <= 0 {
        return Ok(None);
    }
    let Some(sku) = Sku::find_by_id(sku_id).one(conn).await? else {
        return Ok(None);
    };
    let Some(category_id) = sku.category_id else {
        debug!(sku_id = %sku_id, "Sku has no category; no putaway zone");
        return Ok(None);
    };
    let Some(category) = Category::find_by_id(category_id).one(conn).await? else {
        return Ok(None);
    };

    let zone_code = zone_code_for_category(&category.code);
    let Some(zone) = Zone::find()
        .filter(zone::Column::WarehouseId.eq(warehouse_id))
        .filter(zone::Column::Code.eq(zone_code.as_str()))
        .filter(zone::Column::Active.eq(true))
        .one(conn)
        .await?
    else {
        debug!(zone_code = %zone_code, "Convention zone missing or inactive");
        return Ok(None);
    };

    let bins = locations::putaway_candidates(conn, warehouse_id, Some(zone.id)).await?;
    let ids: Vec<Uuid> = bins.iter().map(|b| b.id).collect();
    let occupied = ledger::occupied_by_location(conn, &ids).await?;

    let mut best: Option<(&location::Model, i64)> = None;
    for bin in &bins {
        let used = occupied.get(&bin.id).copied().unwrap_or(0);
        let residual = ledger::residual_capacity(bin.max_weight_kg, used);
        if residual < quantity {
            continue;
        }
        if best.map_or(true, |(_, top)| residual > top) {
            best = Some((bin, residual));
        }
    }
    let Some((bin, residual)) = best else {
        return Ok(None);
    };

    let ancestry = locations::ancestry(conn, bin.id).await?;
    let rack_code = ancestry
        .ancestor_of_type(LocationType::Rack)
        .map(|l| l.code.clone());
    let aisle_code = ancestry
        .ancestor_of_type(LocationType::Aisle)
        .map(|l| l.code.clone());

    Ok(Some(PutawaySuggestion {
        sku_id,
        quantity,
        zone_id: zone.id,
        reason: format!(
            "category {} maps to zone {}; bin {} has the most free capacity ({})",
            category.code, zone.code, bin.code, residual
        ),
        zone_code: zone.code,
        location_id: bin.id,
        location_code: bin.code.clone(),
        rack_code,
        aisle_code,
        residual_capacity: residual,
    }))
}

/// Batch [`suggest_location`] over parallel lists; lines without a suggestion are dropped.
pub async fn suggest_locations<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    sku_ids: &[Uuid],
    quantities: &[i64],
) -> Result<Vec<PutawaySuggestion>, ServiceError> {
    if sku_ids.len() != quantities.len() {
        return Err(ServiceError::ValidationError(format!(
            "{} skus but {} quantities",
            sku_ids.len(),
            quantities.len()
        )));
    }
    let mut suggestions = Vec::new();
    for (sku_id, quantity) in sku_ids.iter().zip(quantities) {
        if let Some(s) = suggest_location(conn, warehouse_id, *sku_id, *quantity).await? {
            suggestions.push(s);
        }
    }
    Ok(suggestions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct PutawayConfirmation {
    pub item_id: Uuid,
    pub location_id: Uuid,
    #[validate(custom = "ledger::validate_positive_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutawayTaskView {
    #[serde(flatten)]
    pub task: putaway_task::Model,
    pub items: Vec<putaway_task_item::Model>,
}

impl PutawayTaskView {
    pub fn remaining(&self) -> i64 {
        self.items.iter().map(|i| i.remaining()).sum()
    }
}

#[derive(Clone)]
pub struct PutawayService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    max_page_size: u64,
}

impl PutawayService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>, max_page_size: u64) -> Self {
        Self {
            db,
            event_sender,
            max_page_size,
        }
    }

    pub async fn suggest(
        &self,
        warehouse_id: Uuid,
        sku_id: Uuid,
        quantity: i64,
    ) -> Result<Option<PutawaySuggestion>, ServiceError> {
        suggest_location(&*self.db, warehouse_id, sku_id, quantity).await
    }

    pub async fn suggest_batch(
        &self,
        warehouse_id: Uuid,
        sku_ids: &[Uuid],
        quantities: &[i64],
    ) -> Result<Vec<PutawaySuggestion>, ServiceError> {
        suggest_locations(&*self.db, warehouse_id, sku_ids, quantities).await
    }

    #[instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        warehouse_id: Uuid,
        status: Option<PutawayStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<putaway_task::Model>, ServiceError> {
        let page = page.clamped(self.max_page_size);
        let mut query = PutawayTask::find().filter(putaway_task::Column::WarehouseId.eq(warehouse_id));
        if let Some(status) = status {
            query = query.filter(putaway_task::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(putaway_task::Column::CreatedAt)
            .paginate(&*self.db, page.limit);
        let total = paginator.num_items().await?;
        let tasks = paginator.fetch_page(page.page - 1).await?;
        Ok(PaginatedResponse::new(tasks, total, page))
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<PutawayTaskView, ServiceError> {
        let db = &*self.db;
        let task = find_task(db, task_id, false).await?;
        let items = task_items(db, task_id).await?;
        Ok(PutawayTaskView { task, items })
    }

    /// Replaces staging suggestions with advisor picks where the advisor has one.
    #[instrument(skip(self))]
    pub async fn refine_suggestions(
        &self,
        task_id: Uuid,
        actor: &Actor,
    ) -> Result<PutawayTaskView, ServiceError> {
        actor.require(Permission::ConfirmPutaway)?;
        let txn = self.db.begin().await?;
        let task = find_task(&txn, task_id, true).await?;
        let mut items = task_items(&txn, task_id).await?;

        let mut refined = 0;
        for item in items.iter_mut().filter(|i| !i.is_complete()) {
            let suggestion =
                suggest_location(&txn, task.warehouse_id, item.sku_id, item.remaining()).await?;
            let Some(suggestion) = suggestion else { continue };
            if suggestion.location_id == item.suggested_location_id {
                continue;
            }
            let mut active: putaway_task_item::ActiveModel = item.clone().into();
            active.suggested_location_id = Set(suggestion.location_id);
            *item = active.update(&txn).await?;
            refined += 1;
        }
        txn.commit().await?;

        info!(task_id = %task_id, refined, "Putaway suggestions refined");
        Ok(PutawayTaskView { task, items })
    }

    /// Applies keeper-confirmed placements; partial quantities are allowed.
    #[instrument(skip(self, confirmations), fields(lines = confirmations.len()))]
    pub async fn confirm(
        &self,
        task_id: Uuid,
        confirmations: &[PutawayConfirmation],
        actor: &Actor,
    ) -> Result<PutawayTaskView, ServiceError> {
        actor.require(Permission::ConfirmPutaway)?;
        if confirmations.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one confirmation is required".to_string(),
            ));
        }
        for confirmation in confirmations {
            confirmation.validate()?;
        }

        let txn = self.db.begin().await?;
        let task = find_task(&txn, task_id, true).await?;
        if task.status == PutawayStatus::Done {
            return Err(ServiceError::InvalidTransition(format!(
                "putaway task {} is already done",
                task_id
            )));
        }
        let mut items = task_items(&txn, task_id).await?;
        let reference = DocumentRef::new(PUTAWAY_REFERENCE_TABLE, task_id);
        let mut total_quantity = 0;

        for confirmation in confirmations {
            let item = items
                .iter_mut()
                .find(|i| i.id == confirmation.item_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "item {} not found on putaway task {}",
                        confirmation.item_id, task_id
                    ))
                })?;
            if confirmation.quantity > item.remaining() {
                return Err(ServiceError::ValidationError(format!(
                    "quantity {} exceeds remaining {} for item {}",
                    confirmation.quantity,
                    item.remaining(),
                    item.id
                )));
            }

            let bin = target_bin(&txn, &task, confirmation.location_id).await?;
            let occupied = ledger::occupied_qty(&txn, bin.id).await?;
            let residual = ledger::residual_capacity(bin.max_weight_kg, occupied);
            if residual < confirmation.quantity {
                warn!(
                    location_id = %bin.id,
                    residual,
                    requested = confirmation.quantity,
                    "Putaway exceeds bin capacity"
                );
                return Err(ServiceError::CapacityViolation(format!(
                    "bin {} has room for {} but {} were confirmed",
                    bin.code, residual, confirmation.quantity
                )));
            }

            let source = LedgerKey::new(
                task.warehouse_id,
                item.sku_id,
                item.lot_id,
                task.from_location_id,
            );
            ledger::apply_movement(
                &txn,
                source,
                -confirmation.quantity,
                TransactionType::Putaway,
                reference,
                actor,
            )
            .await?;
            ledger::apply_movement(
                &txn,
                source.at(bin.id),
                confirmation.quantity,
                TransactionType::Putaway,
                reference,
                actor,
            )
            .await?;

            let mut active: putaway_task_item::ActiveModel = item.clone().into();
            active.putaway_qty = Set(item.putaway_qty + confirmation.quantity);
            active.actual_location_id = Set(Some(bin.id));
            *item = active.update(&txn).await?;
            total_quantity += confirmation.quantity;
        }

        let now = Some(Utc::now());
        let done = items.iter().all(|i| i.is_complete());
        let mut active: putaway_task::ActiveModel = task.into();
        active.status = Set(if done {
            PutawayStatus::Done
        } else {
            PutawayStatus::InProgress
        });
        active.updated_at = Set(now);
        if done {
            active.completed_at = Set(now);
        }
        let task = active.update(&txn).await?;
        txn.commit().await?;

        info!(task_id = %task_id, total_quantity, status = %task.status, "Putaway confirmed");
        self.event_sender
            .emit(Event::PutawayConfirmed {
                task_id,
                item_count: confirmations.len(),
                total_quantity,
            })
            .await;
        if done {
            self.event_sender
                .emit(Event::PutawayCompleted { task_id })
                .await;
        }
        Ok(PutawayTaskView { task, items })
    }
}

async fn find_task<C: ConnectionTrait>(
    conn: &C,
    task_id: Uuid,
    for_update: bool,
) -> Result<putaway_task::Model, ServiceError> {
    let mut query = PutawayTask::find_by_id(task_id);
    if for_update {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Putaway task {} not found", task_id)))
}

async fn task_items<C: ConnectionTrait>(
    conn: &C,
    task_id: Uuid,
) -> Result<Vec<putaway_task_item::Model>, ServiceError> {
    Ok(PutawayTaskItem::find()
        .filter(putaway_task_item::Column::TaskId.eq(task_id))
        .order_by_asc(putaway_task_item::Column::Id)
        .all(conn)
        .await?)
}

async fn target_bin<C: ConnectionTrait>(
    conn: &C,
    task: &putaway_task::Model,
    location_id: Uuid,
) -> Result<location::Model, ServiceError> {
    let bin = locations::find_location(conn, location_id).await?;
    if bin.warehouse_id != task.warehouse_id || !bin.is_bin() || bin.is_staging {
        return Err(ServiceError::ValidationError(format!(
            "location {} is not a storage bin of warehouse {}",
            bin.code, task.warehouse_id
        )));
    }
    if !bin.active {
        return Err(ServiceError::PreconditionFailed(format!(
            "location {} is deactivated",
            bin.code
        )));
    }
    Ok(bin)
}
