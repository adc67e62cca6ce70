//! Progress history entity (append-only)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_session_progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub session_id: Uuid,

    pub soc: f64,
    pub power_kw: f64,
    pub energy_delivered_kwh: f64,

    #[sea_orm(nullable)]
    pub estimated_minutes_remaining: Option<f64>,

    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::SessionId",
        to = "super::charging_session::Column::Id"
    )]
    Session,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
