use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Position of a location in the Zone → Aisle → Rack → Bin tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LocationType {
    #[sea_orm(string_value = "AISLE")]
    Aisle,
    #[sea_orm(string_value = "RACK")]
    Rack,
    #[sea_orm(string_value = "BIN")]
    Bin,
}

impl LocationType {
    /// Parent type a location of this type must hang from; aisles sit directly under the zone.
    pub fn expected_parent_type(self) -> Option<LocationType> {
        match self {
            LocationType::Aisle => None,
            LocationType::Rack => Some(LocationType::Aisle),
            LocationType::Bin => Some(LocationType::Rack),
        }
    }

    pub fn holds_inventory(self) -> bool {
        self == LocationType::Bin
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub zone_id: Uuid,
    pub code: String,
    pub location_type: LocationType,
    pub parent_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))", nullable)]
    pub max_weight_kg: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))", nullable)]
    pub max_volume_m3: Option<Decimal>,
    pub is_picking_face: bool,
    pub is_staging: bool,
    pub active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_bin(&self) -> bool {
        self.location_type == LocationType::Bin
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::zone::Entity",
        from = "Column::ZoneId",
        to = "super::zone::Column::Id"
    )]
    Zone,
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
}

impl Related<super::zone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Zone.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_types_follow_the_tree() {
        assert_eq!(LocationType::Aisle.expected_parent_type(), None);
        assert_eq!(LocationType::Rack.expected_parent_type(), Some(LocationType::Aisle));
        assert_eq!(LocationType::Bin.expected_parent_type(), Some(LocationType::Rack));
        assert!(LocationType::Bin.holds_inventory());
        assert!(!LocationType::Rack.holds_inventory());
    }
}
