use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receiving_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receiving_order_id: Uuid,
    pub line_no: i32,
    pub sku_id: Uuid,
    pub received_qty: i64,
    pub lot_number: Option<String>,
    pub manufactured_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    /// Filled in when the order is posted.
    pub lot_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receiving_order::Entity",
        from = "Column::ReceivingOrderId",
        to = "super::receiving_order::Column::Id"
    )]
    ReceivingOrder,
}

impl Related<super::receiving_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceivingOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
