//! Booking payment entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "booking_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub booking_id: Uuid,

    pub provider: String,

    pub amount: f64,

    /// Pending, Succeeded, Failed
    pub status: String,

    #[sea_orm(nullable)]
    pub bank_code: Option<String>,

    /// Provider order reference (unique)
    #[sea_orm(nullable, unique)]
    pub txn_ref: Option<String>,

    #[sea_orm(nullable)]
    pub txn_no: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
