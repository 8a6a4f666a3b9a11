use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_snapshot;
use crate::entities::inventory_transaction;
use crate::errors::ServiceError;
use crate::services::ledger::{self, MovementFilter, StockLevel};
use crate::{PageRequest, PaginatedResponse};

/// Stock level of one sku, tagged for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuStock {
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    #[serde(flatten)]
    pub level: StockLevel,
}

/// Read side of the inventory ledger
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    max_page_size: u64,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, max_page_size: u64) -> Self {
        Self { db, max_page_size }
    }

    #[instrument(skip(self))]
    pub async fn stock_level(&self, warehouse_id: Uuid, sku_id: Uuid) -> Result<SkuStock, ServiceError> {
        let level = ledger::stock_level(&*self.db, warehouse_id, sku_id).await?;
        Ok(SkuStock {
            warehouse_id,
            sku_id,
            level,
        })
    }

    /// Stock for several skus; unknown skus report zero.
    #[instrument(skip(self, sku_ids), fields(skus = sku_ids.len()))]
    pub async fn stock_levels(
        &self,
        warehouse_id: Uuid,
        sku_ids: &[Uuid],
    ) -> Result<Vec<SkuStock>, ServiceError> {
        let levels: HashMap<Uuid, StockLevel> =
            ledger::stock_levels(&*self.db, warehouse_id, sku_ids).await?;
        Ok(sku_ids
            .iter()
            .map(|sku_id| SkuStock {
                warehouse_id,
                sku_id: *sku_id,
                level: levels.get(sku_id).copied().unwrap_or_default(),
            })
            .collect())
    }

    pub async fn available_qty(&self, warehouse_id: Uuid, sku_id: Uuid) -> Result<i64, ServiceError> {
        ledger::available_qty(&*self.db, warehouse_id, sku_id).await
    }

    /// Non-empty ledger cells at one location.
    pub async fn stock_at_location(
        &self,
        location_id: Uuid,
    ) -> Result<Vec<inventory_snapshot::Model>, ServiceError> {
        ledger::cells_at(&*self.db, location_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: PageRequest,
    ) -> Result<PaginatedResponse<inventory_transaction::Model>, ServiceError> {
        ledger::list_movements(&*self.db, &filter, page.clamped(self.max_page_size)).await
    }
}
