//! Location hierarchy manager.
//!
//! Maintains the Zone → Aisle → Rack → Bin tree: write-time hierarchy checks,
//! bin capacity, one-way deactivation and the occupancy views derived from the
//! ledger.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, Permission};
use crate::entities::inventory_snapshot::{self, Entity as InventorySnapshot};
use crate::entities::location::{self, Entity as Location, LocationType};
use crate::entities::zone::{self, Entity as Zone};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{self, OccupancyStatus};
use crate::{PageRequest, PaginatedResponse};

/// Zone → Aisle → Rack → Bin: no location is more than this many hops below its zone.
pub const MAX_HIERARCHY_HOPS: usize = 3;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateLocationRequest {
    pub warehouse_id: Uuid,
    pub zone_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub location_type: LocationType,
    pub parent_id: Option<Uuid>,
    pub max_weight_kg: Option<Decimal>,
    pub max_volume_m3: Option<Decimal>,
    #[serde(default)]
    pub is_picking_face: bool,
    #[serde(default)]
    pub is_staging: bool,
}

/// Mutable attributes only; code, zone, type and parent are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateLocationRequest {
    pub capacity: Option<CapacityRequest>,
    pub is_picking_face: Option<bool>,
    pub is_staging: Option<bool>,
}

/// Replaces both capacity limits; `None` clears a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CapacityRequest {
    pub max_weight_kg: Option<Decimal>,
    pub max_volume_m3: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationFilter {
    pub warehouse_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub location_type: Option<LocationType>,
    pub parent_id: Option<Uuid>,
    pub active: Option<bool>,
}

/// A location with its zone and parent codes resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    #[serde(flatten)]
    pub location: location::Model,
    pub zone_code: Option<String>,
    pub parent_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAncestry {
    pub zone: zone::Model,
    /// Starts at the requested location and ends at its aisle.
    pub chain: Vec<location::Model>,
}

impl LocationAncestry {
    pub fn codes(&self) -> Vec<&str> {
        self.chain.iter().map(|l| l.code.as_str()).collect()
    }

    pub fn ancestor_of_type(&self, location_type: LocationType) -> Option<&location::Model> {
        self.chain.iter().find(|l| l.location_type == location_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyLine {
    pub sku_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: i64,
    pub reserved_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinOccupancy {
    pub location_id: Uuid,
    pub code: String,
    pub zone_id: Uuid,
    pub max_weight_kg: Option<Decimal>,
    pub max_volume_m3: Option<Decimal>,
    pub occupied: i64,
    pub status: OccupancyStatus,
    pub is_staging: bool,
    pub active: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub lines: Vec<OccupancyLine>,
}

impl BinOccupancy {
    fn new(bin: &location::Model, occupied: i64) -> Self {
        Self {
            location_id: bin.id,
            code: bin.code.clone(),
            zone_id: bin.zone_id,
            max_weight_kg: bin.max_weight_kg,
            max_volume_m3: bin.max_volume_m3,
            occupied,
            status: OccupancyStatus::classify(occupied, bin.max_weight_kg),
            is_staging: bin.is_staging,
            active: bin.active,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OccupancyFilter {
    pub warehouse_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub status: Option<OccupancyStatus>,
}

#[derive(Clone)]
pub struct LocationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    max_page_size: u64,
}

impl LocationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>, max_page_size: u64) -> Self {
        Self {
            db,
            event_sender,
            max_page_size,
        }
    }

    #[instrument(skip(self, request), fields(code = %request.code, location_type = %request.location_type))]
    pub async fn create_location(
        &self,
        request: CreateLocationRequest,
        actor: &Actor,
    ) -> Result<location::Model, ServiceError> {
        actor.require(Permission::ManageLocations)?;
        request.validate()?;
        let code = request.code.trim().to_string();
        if code.is_empty() {
            return Err(ServiceError::ValidationError("location code is required".to_string()));
        }
        validate_attributes(
            request.location_type,
            &CapacityRequest {
                max_weight_kg: request.max_weight_kg,
                max_volume_m3: request.max_volume_m3,
            },
            request.is_picking_face,
            request.is_staging,
        )?;

        let txn = self.db.begin().await?;

        let zone = Zone::find_by_id(request.zone_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Zone {} not found", request.zone_id)))?;
        if zone.warehouse_id != request.warehouse_id {
            return Err(ServiceError::ValidationError(format!(
                "zone {} does not belong to warehouse {}",
                zone.code, request.warehouse_id
            )));
        }
        if !zone.active {
            return Err(ServiceError::ValidationError(format!("zone {} is inactive", zone.code)));
        }

        let duplicate = Location::find()
            .filter(location::Column::ZoneId.eq(zone.id))
            .filter(location::Column::Code.eq(code.as_str()))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::ValidationError(format!(
                "location code {} already exists in zone {}",
                code, zone.code
            )));
        }

        validate_hierarchy(&txn, request.location_type, request.parent_id, &zone).await?;

        let now = Utc::now();
        let created = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(request.warehouse_id),
            zone_id: Set(zone.id),
            code: Set(code),
            location_type: Set(request.location_type),
            parent_id: Set(request.parent_id),
            max_weight_kg: Set(request.max_weight_kg),
            max_volume_m3: Set(request.max_volume_m3),
            is_picking_face: Set(request.is_picking_face),
            is_staging: Set(request.is_staging),
            active: Set(true),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(None),
            deactivated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(location_id = %created.id, zone = %zone.code, "Location created");
        self.event_sender
            .emit(Event::LocationCreated {
                location_id: created.id,
                warehouse_id: created.warehouse_id,
                code: created.code.clone(),
            })
            .await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update_location(
        &self,
        location_id: Uuid,
        request: UpdateLocationRequest,
        actor: &Actor,
    ) -> Result<location::Model, ServiceError> {
        actor.require(Permission::ManageLocations)?;
        let txn = self.db.begin().await?;
        let current = load_for_update(&txn, location_id).await?;

        let capacity = request.capacity.unwrap_or(CapacityRequest {
            max_weight_kg: current.max_weight_kg,
            max_volume_m3: current.max_volume_m3,
        });
        let is_picking_face = request.is_picking_face.unwrap_or(current.is_picking_face);
        let is_staging = request.is_staging.unwrap_or(current.is_staging);
        validate_attributes(current.location_type, &capacity, is_picking_face, is_staging)?;

        if request.capacity.is_some() {
            check_capacity_covers_stock(&txn, &current, &capacity).await?;
        }

        let mut active: location::ActiveModel = current.into();
        active.max_weight_kg = Set(capacity.max_weight_kg);
        active.max_volume_m3 = Set(capacity.max_volume_m3);
        active.is_picking_face = Set(is_picking_face);
        active.is_staging = Set(is_staging);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!(location_id = %updated.id, "Location updated");
        Ok(updated)
    }

    /// Sets the capacity limits of a bin.
    #[instrument(skip(self))]
    pub async fn configure_capacity(
        &self,
        bin_id: Uuid,
        capacity: CapacityRequest,
        actor: &Actor,
    ) -> Result<location::Model, ServiceError> {
        self.update_location(
            bin_id,
            UpdateLocationRequest {
                capacity: Some(capacity),
                ..Default::default()
            },
            actor,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_location(
        &self,
        location_id: Uuid,
        actor: &Actor,
    ) -> Result<location::Model, ServiceError> {
        actor.require(Permission::ManageLocations)?;
        let txn = self.db.begin().await?;
        let current = load_for_update(&txn, location_id).await?;

        let holding = InventorySnapshot::find()
            .filter(inventory_snapshot::Column::LocationId.eq(location_id))
            .filter(
                inventory_snapshot::Column::Quantity
                    .gt(0)
                    .or(inventory_snapshot::Column::ReservedQty.gt(0)),
            )
            .count(&txn)
            .await?;
        if holding > 0 {
            warn!(location_id = %location_id, "Refusing to deactivate a location holding stock");
            return Err(ServiceError::PreconditionFailed(format!(
                "location {} still holds inventory",
                current.code
            )));
        }

        let children = Location::find()
            .filter(location::Column::ParentId.eq(location_id))
            .filter(location::Column::Active.eq(true))
            .count(&txn)
            .await?;
        if children > 0 {
            return Err(ServiceError::PreconditionFailed(format!(
                "location {} has {} active child locations",
                current.code, children
            )));
        }

        let now = Utc::now();
        let mut active: location::ActiveModel = current.into();
        active.active = Set(false);
        active.deactivated_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(location_id = %location_id, "Location deactivated");
        self.event_sender
            .emit(Event::LocationDeactivated { location_id })
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_location(&self, location_id: Uuid) -> Result<LocationView, ServiceError> {
        let db = &*self.db;
        let found = find_location(db, location_id).await?;
        let mut views = decorate(db, vec![found]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::InternalError("location view missing".to_string()))
    }

    /// Lists locations ordered by code; inactive rows are included unless filtered out.
    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        filter: LocationFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<LocationView>, ServiceError> {
        let db = &*self.db;
        let page = page.clamped(self.max_page_size);

        let mut query = Location::find();
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(location::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(zone_id) = filter.zone_id {
            query = query.filter(location::Column::ZoneId.eq(zone_id));
        }
        if let Some(location_type) = filter.location_type {
            query = query.filter(location::Column::LocationType.eq(location_type));
        }
        if let Some(parent_id) = filter.parent_id {
            query = query.filter(location::Column::ParentId.eq(parent_id));
        }
        if let Some(active) = filter.active {
            query = query.filter(location::Column::Active.eq(active));
        }

        let paginator = query
            .order_by_asc(location::Column::Code)
            .order_by_asc(location::Column::Id)
            .paginate(db, page.limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.page - 1).await?;
        let items = decorate(db, rows).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    #[instrument(skip(self))]
    pub async fn ancestry(&self, location_id: Uuid) -> Result<LocationAncestry, ServiceError> {
        ancestry(&*self.db, location_id).await
    }

    #[instrument(skip(self))]
    pub async fn view_bin_occupancy(&self, bin_id: Uuid) -> Result<BinOccupancy, ServiceError> {
        let db = &*self.db;
        let bin = find_location(db, bin_id).await?;
        if !bin.is_bin() {
            return Err(ServiceError::ValidationError(format!(
                "location {} is a {}, not a BIN",
                bin.code, bin.location_type
            )));
        }

        let cells = ledger::cells_at(db, bin.id).await?;
        let occupied = cells.iter().map(|c| c.quantity).sum();
        let mut view = BinOccupancy::new(&bin, occupied);
        view.lines = cells
            .into_iter()
            .map(|c| OccupancyLine {
                sku_id: c.sku_id,
                lot_id: c.lot_id,
                quantity: c.quantity,
                reserved_qty: c.reserved_qty,
            })
            .collect();
        Ok(view)
    }

    /// Occupancy of every bin matching the filter, ordered by code.
    #[instrument(skip(self))]
    pub async fn list_bin_occupancy(
        &self,
        filter: OccupancyFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<BinOccupancy>, ServiceError> {
        let db = &*self.db;
        let page = page.clamped(self.max_page_size);

        let mut query = Location::find().filter(location::Column::LocationType.eq(LocationType::Bin));
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(location::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(zone_id) = filter.zone_id {
            query = query.filter(location::Column::ZoneId.eq(zone_id));
        }
        let bins = query
            .order_by_asc(location::Column::Code)
            .order_by_asc(location::Column::Id)
            .all(db)
            .await?;

        let ids: Vec<Uuid> = bins.iter().map(|b| b.id).collect();
        let occupied = ledger::occupied_by_location(db, &ids).await?;

        // Status is derived from the ledger, so filtering happens after aggregation.
        let views: Vec<BinOccupancy> = bins
            .iter()
            .map(|bin| BinOccupancy::new(bin, occupied.get(&bin.id).copied().unwrap_or(0)))
            .filter(|view| filter.status.map_or(true, |status| view.status == status))
            .collect();
        Ok(PaginatedResponse::from_vec(views, page))
    }

    /// Active, non-staging bins with nothing in them.
    #[instrument(skip(self))]
    pub async fn search_empty_bins(
        &self,
        warehouse_id: Uuid,
        zone_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<location::Model>, ServiceError> {
        let db = &*self.db;
        let limit = limit.clamp(1, self.max_page_size.max(1)) as usize;

        let bins = putaway_candidates(db, warehouse_id, zone_id).await?;
        let ids: Vec<Uuid> = bins.iter().map(|b| b.id).collect();
        let occupied = ledger::occupied_by_location(db, &ids).await?;

        Ok(bins
            .into_iter()
            .filter(|b| occupied.get(&b.id).copied().unwrap_or(0) <= 0)
            .take(limit)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn staging_location(&self, warehouse_id: Uuid) -> Result<location::Model, ServiceError> {
        resolve_staging(&*self.db, warehouse_id).await
    }
}

fn validate_attributes(
    location_type: LocationType,
    capacity: &CapacityRequest,
    is_picking_face: bool,
    is_staging: bool,
) -> Result<(), ServiceError> {
    let has_capacity = capacity.max_weight_kg.is_some() || capacity.max_volume_m3.is_some();
    if !location_type.holds_inventory() && (has_capacity || is_picking_face || is_staging) {
        return Err(ServiceError::ValidationError(format!(
            "capacity and operational flags only apply to BIN locations, not {}",
            location_type
        )));
    }
    for (name, value) in [
        ("max_weight_kg", capacity.max_weight_kg),
        ("max_volume_m3", capacity.max_volume_m3),
    ] {
        if value.map_or(false, |v| v.is_sign_negative()) {
            return Err(ServiceError::ValidationError(format!("{} must not be negative", name)));
        }
    }
    Ok(())
}

/// Checks that `parent_id` is what a location of `location_type` may hang from in `zone`.
pub async fn validate_hierarchy<C: ConnectionTrait>(
    conn: &C,
    location_type: LocationType,
    parent_id: Option<Uuid>,
    zone: &zone::Model,
) -> Result<Option<location::Model>, ServiceError> {
    let (expected, parent_id) = match (location_type.expected_parent_type(), parent_id) {
        (None, None) => return Ok(None),
        (None, Some(_)) => {
            return Err(ServiceError::HierarchyViolation(format!(
                "{} locations sit directly under a zone and cannot have a parent",
                location_type
            )))
        }
        (Some(expected), None) => {
            return Err(ServiceError::HierarchyViolation(format!(
                "{} locations require a {} parent",
                location_type, expected
            )))
        }
        (Some(expected), Some(parent_id)) => (expected, parent_id),
    };

    let parent = Location::find_by_id(parent_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Parent location {} not found", parent_id)))?;

    if parent.location_type != expected {
        return Err(ServiceError::HierarchyViolation(format!(
            "{} parent must be a {}, got {} {}",
            location_type, expected, parent.location_type, parent.code
        )));
    }
    if parent.zone_id != zone.id {
        return Err(ServiceError::HierarchyViolation(format!(
            "parent {} is not in zone {}",
            parent.code, zone.code
        )));
    }
    if !parent.active {
        return Err(ServiceError::HierarchyViolation(format!(
            "parent {} is inactive",
            parent.code
        )));
    }
    Ok(Some(parent))
}

/// Walks parent links upward; the zone counts as the final of [`MAX_HIERARCHY_HOPS`] hops.
pub async fn ancestry<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
) -> Result<LocationAncestry, ServiceError> {
    let start = find_location(conn, location_id).await?;
    let mut seen = HashSet::from([start.id]);
    let mut chain = vec![start];

    loop {
        let Some(current) = chain.last() else { break };
        let Some(parent_id) = current.parent_id else { break };
        if chain.len() >= MAX_HIERARCHY_HOPS {
            return Err(ServiceError::HierarchyViolation(format!(
                "location {} is nested deeper than {} levels",
                location_id, MAX_HIERARCHY_HOPS
            )));
        }
        if !seen.insert(parent_id) {
            return Err(ServiceError::HierarchyViolation(format!(
                "cycle detected at location {}",
                parent_id
            )));
        }
        let parent = find_location(conn, parent_id).await?;
        chain.push(parent);
    }

    let zone_id = chain.first().map(|l| l.zone_id).unwrap_or_default();
    let zone = Zone::find_by_id(zone_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Zone {} not found", zone_id)))?;
    Ok(LocationAncestry { zone, chain })
}

/// The warehouse's receiving staging bin: active, flagged staging, lowest code.
pub async fn resolve_staging<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
) -> Result<location::Model, ServiceError> {
    Location::find()
        .filter(location::Column::WarehouseId.eq(warehouse_id))
        .filter(location::Column::LocationType.eq(LocationType::Bin))
        .filter(location::Column::IsStaging.eq(true))
        .filter(location::Column::Active.eq(true))
        .order_by_asc(location::Column::Code)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::PreconditionFailed(format!(
                "warehouse {} has no active staging location",
                warehouse_id
            ))
        })
}

/// Active, non-staging bins of a warehouse (optionally one zone), ordered by code.
pub async fn putaway_candidates<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    zone_id: Option<Uuid>,
) -> Result<Vec<location::Model>, ServiceError> {
    let mut query = Location::find()
        .filter(location::Column::WarehouseId.eq(warehouse_id))
        .filter(location::Column::LocationType.eq(LocationType::Bin))
        .filter(location::Column::Active.eq(true))
        .filter(location::Column::IsStaging.eq(false));
    if let Some(zone_id) = zone_id {
        query = query.filter(location::Column::ZoneId.eq(zone_id));
    }
    Ok(query.order_by_asc(location::Column::Code).all(conn).await?)
}

pub async fn find_location<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
) -> Result<location::Model, ServiceError> {
    Location::find_by_id(location_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))
}

async fn load_for_update<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
) -> Result<location::Model, ServiceError> {
    let current = Location::find_by_id(location_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))?;
    if !current.active {
        return Err(ServiceError::PreconditionFailed(format!(
            "location {} is deactivated",
            current.code
        )));
    }
    Ok(current)
}

async fn check_capacity_covers_stock<C: ConnectionTrait>(
    conn: &C,
    bin: &location::Model,
    capacity: &CapacityRequest,
) -> Result<(), ServiceError> {
    let Some(max_weight) = capacity.max_weight_kg else {
        return Ok(());
    };
    let occupied = ledger::occupied_qty(conn, bin.id).await?;
    if max_weight < Decimal::from(occupied) {
        warn!(location_id = %bin.id, occupied, %max_weight, "Capacity below current occupancy");
        return Err(ServiceError::CapacityViolation(format!(
            "capacity {} for {} is below current occupancy {}",
            max_weight, bin.code, occupied
        )));
    }
    Ok(())
}

async fn decorate<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<location::Model>,
) -> Result<Vec<LocationView>, ServiceError> {
    let zone_ids: HashSet<Uuid> = rows.iter().map(|l| l.zone_id).collect();
    let parent_ids: HashSet<Uuid> = rows.iter().filter_map(|l| l.parent_id).collect();

    let zone_codes: HashMap<Uuid, String> = if zone_ids.is_empty() {
        HashMap::new()
    } else {
        Zone::find()
            .select_only()
            .column(zone::Column::Id)
            .column(zone::Column::Code)
            .filter(zone::Column::Id.is_in(zone_ids))
            .into_tuple::<(Uuid, String)>()
            .all(conn)
            .await?
            .into_iter()
            .collect()
    };
    let parent_codes: HashMap<Uuid, String> = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        Location::find()
            .select_only()
            .column(location::Column::Id)
            .column(location::Column::Code)
            .filter(location::Column::Id.is_in(parent_ids))
            .into_tuple::<(Uuid, String)>()
            .all(conn)
            .await?
            .into_iter()
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|location| LocationView {
            zone_code: zone_codes.get(&location.zone_id).cloned(),
            parent_code: location.parent_id.and_then(|p| parent_codes.get(&p).cloned()),
            location,
        })
        .collect())
}
