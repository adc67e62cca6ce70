//! Create payment_transactions table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentTransactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(PaymentTransactions::ReservationId).uuid())
                    .col(ColumnDef::new(PaymentTransactions::SessionId).uuid())
                    .col(ColumnDef::new(PaymentTransactions::Amount).double().not_null())
                    .col(ColumnDef::new(PaymentTransactions::Method).string().not_null())
                    .col(
                        ColumnDef::new(PaymentTransactions::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(PaymentTransactions::ProviderRef).string())
                    .col(ColumnDef::new(PaymentTransactions::ProviderTxnNo).string())
                    .col(ColumnDef::new(PaymentTransactions::ResponseCode).string())
                    .col(ColumnDef::new(PaymentTransactions::BankCode).string())
                    .col(
                        ColumnDef::new(PaymentTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentTransactions::CapturedAt)
                            .timestamp_with_time_zone(),
                    )
                    .to_owned(),
            )
            .await?;

        // Idempotency key for callbacks
        manager
            .create_index(
                Index::create()
                    .name("ux_payment_transactions_provider_ref")
                    .table(PaymentTransactions::Table)
                    .col(PaymentTransactions::ProviderRef)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_transactions_session")
                    .table(PaymentTransactions::Table)
                    .col(PaymentTransactions::SessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PaymentTransactions {
    Table,
    Id,
    UserId,
    ReservationId,
    SessionId,
    Amount,
    Method,
    Status,
    ProviderRef,
    ProviderTxnNo,
    ResponseCode,
    BankCode,
    CreatedAt,
    UpdatedAt,
    CapturedAt,
}
