//! Reservation entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(nullable)]
    pub vehicle_id: Option<Uuid>,

    pub spot_id: Uuid,
    pub station_id: Uuid,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// Pending, Confirmed, CheckedIn, Completed, Cancelled
    pub status: String,

    #[sea_orm(unique)]
    pub confirmation_code: String,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_spot::Entity",
        from = "Column::SpotId",
        to = "super::charging_spot::Column::Id"
    )]
    ChargingSpot,
}

impl Related<super::charging_spot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSpot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
