//! Charging session entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(nullable)]
    pub vehicle_id: Option<Uuid>,

    pub spot_id: Uuid,
    pub station_id: Uuid,

    #[sea_orm(nullable)]
    pub reservation_id: Option<Uuid>,

    /// InProgress, Completed, Cancelled, Failed
    pub status: String,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    pub initial_soc: f64,
    pub target_soc: f64,

    #[sea_orm(nullable)]
    pub energy_requested_kwh: Option<f64>,

    pub energy_delivered_kwh: f64,

    /// Price snapshot taken at start
    pub price_per_kwh: f64,

    #[sea_orm(nullable)]
    pub cost: Option<f64>,

    // Live progress
    #[sea_orm(nullable)]
    pub current_soc: Option<f64>,
    #[sea_orm(nullable)]
    pub current_power_kw: Option<f64>,
    #[sea_orm(nullable)]
    pub estimated_minutes_remaining: Option<f64>,
    #[sea_orm(nullable)]
    pub last_updated_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_spot::Entity",
        from = "Column::SpotId",
        to = "super::charging_spot::Column::Id"
    )]
    ChargingSpot,
    #[sea_orm(has_many = "super::charging_session_progress::Entity")]
    Progress,
}

impl Related<super::charging_spot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSpot.def()
    }
}

impl Related<super::charging_session_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
