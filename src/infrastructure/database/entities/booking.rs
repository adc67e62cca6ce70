//! Booking entity (pay-per-use flow)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    /// Pending, Confirmed, Cancelled
    pub status: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking_session::Entity")]
    BookingSession,
    #[sea_orm(has_many = "super::booking_payment::Entity")]
    BookingPayment,
}

impl Related<super::booking_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookingSession.def()
    }
}

impl Related<super::booking_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookingPayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
