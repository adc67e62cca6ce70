//! Create bookings, booking_sessions and booking_payments tables

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_stations::ChargingSpots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bookings::UserId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::VehicleId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::StationId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::SpotId).uuid().not_null())
                    .col(
                        ColumnDef::new(Bookings::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_spot")
                            .from(Bookings::Table, Bookings::SpotId)
                            .to(ChargingSpots::Table, ChargingSpots::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_spot_window")
                    .table(Bookings::Table)
                    .col(Bookings::SpotId)
                    .col(Bookings::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BookingSessions::BookingId).uuid().not_null())
                    .col(ColumnDef::new(BookingSessions::SpotId).uuid().not_null())
                    .col(
                        ColumnDef::new(BookingSessions::PricePerKwh)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingSessions::Status)
                            .string()
                            .not_null()
                            .default("Active"),
                    )
                    .col(
                        ColumnDef::new(BookingSessions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingSessions::EndTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(BookingSessions::EnergyKwh).double())
                    .col(ColumnDef::new(BookingSessions::Cost).double())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_sessions_booking")
                            .from(BookingSessions::Table, BookingSessions::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingPayments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BookingPayments::BookingId).uuid().not_null())
                    .col(ColumnDef::new(BookingPayments::Provider).string().not_null())
                    .col(ColumnDef::new(BookingPayments::Amount).double().not_null())
                    .col(
                        ColumnDef::new(BookingPayments::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(BookingPayments::BankCode).string())
                    .col(ColumnDef::new(BookingPayments::TxnRef).string())
                    .col(ColumnDef::new(BookingPayments::TxnNo).string())
                    .col(
                        ColumnDef::new(BookingPayments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingPayments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_payments_booking")
                            .from(BookingPayments::Table, BookingPayments::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_booking_payments_txn_ref")
                    .table(BookingPayments::Table)
                    .col(BookingPayments::TxnRef)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_payments_booking")
                    .table(BookingPayments::Table)
                    .col(BookingPayments::BookingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookingPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BookingSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    UserId,
    VehicleId,
    StationId,
    SpotId,
    StartTime,
    EndTime,
    Status,
    CreatedAt,
}

#[derive(Iden)]
pub enum BookingSessions {
    Table,
    Id,
    BookingId,
    SpotId,
    PricePerKwh,
    Status,
    StartTime,
    EndTime,
    EnergyKwh,
    Cost,
}

#[derive(Iden)]
pub enum BookingPayments {
    Table,
    Id,
    BookingId,
    Provider,
    Amount,
    Status,
    BankCode,
    TxnRef,
    TxnNo,
    CreatedAt,
    UpdatedAt,
}
