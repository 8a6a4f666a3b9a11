use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Current on-hand and reserved quantity of one ledger cell.
///
/// `lot_key` mirrors `lot_id` with `Uuid::nil()` standing in for "no lot" so the
/// unique index `(warehouse_id, sku_id, lot_key, location_id)` never contains NULL.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_snapshot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub lot_key: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub reserved_qty: i64,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn available(&self) -> i64 {
        (self.quantity - self.reserved_qty).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
