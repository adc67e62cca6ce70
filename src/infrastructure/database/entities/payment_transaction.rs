//! Payment transaction entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(nullable)]
    pub reservation_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub session_id: Option<Uuid>,

    pub amount: f64,

    /// VnPay, MoMo, Cash
    pub method: String,

    /// Pending, Captured, Failed
    pub status: String,

    /// Order reference sent to the provider (unique)
    #[sea_orm(nullable, unique)]
    pub provider_ref: Option<String>,

    #[sea_orm(nullable)]
    pub provider_txn_no: Option<String>,

    #[sea_orm(nullable)]
    pub response_code: Option<String>,

    #[sea_orm(nullable)]
    pub bank_code: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub captured_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
