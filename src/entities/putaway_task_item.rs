use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "putaway_task_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_id: Uuid,
    pub receiving_item_id: Option<Uuid>,
    pub sku_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: i64,
    pub putaway_qty: i64,
    pub suggested_location_id: Uuid,
    pub actual_location_id: Option<Uuid>,
}

impl Model {
    pub fn remaining(&self) -> i64 {
        (self.quantity - self.putaway_qty).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.putaway_qty >= self.quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::putaway_task::Entity",
        from = "Column::TaskId",
        to = "super::putaway_task::Column::Id"
    )]
    Task,
}

impl Related<super::putaway_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
