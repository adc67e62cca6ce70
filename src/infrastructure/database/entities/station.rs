//! Station entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    #[sea_orm(nullable)]
    pub address: Option<String>,

    /// Active, Inactive, Maintenance
    pub status: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charging_spot::Entity")]
    ChargingSpot,
}

impl Related<super::charging_spot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSpot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
