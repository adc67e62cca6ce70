//! Create charging_sessions and charging_session_progress tables

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
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSessions::UserId).uuid().not_null())
                    .col(ColumnDef::new(ChargingSessions::VehicleId).uuid())
                    .col(ColumnDef::new(ChargingSessions::SpotId).uuid().not_null())
                    .col(ColumnDef::new(ChargingSessions::StationId).uuid().not_null())
                    .col(ColumnDef::new(ChargingSessions::ReservationId).uuid())
                    .col(
                        ColumnDef::new(ChargingSessions::Status)
                            .string()
                            .not_null()
                            .default("InProgress"),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargingSessions::InitialSoc)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::TargetSoc)
                            .double()
                            .not_null()
                            .default(100.0),
                    )
                    .col(ColumnDef::new(ChargingSessions::EnergyRequestedKwh).double())
                    .col(
                        ColumnDef::new(ChargingSessions::EnergyDeliveredKwh)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::PricePerKwh)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::Cost).double())
                    .col(ColumnDef::new(ChargingSessions::CurrentSoc).double())
                    .col(ColumnDef::new(ChargingSessions::CurrentPowerKw).double())
                    .col(ColumnDef::new(ChargingSessions::EstimatedMinutesRemaining).double())
                    .col(
                        ColumnDef::new(ChargingSessions::LastUpdatedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(ChargingSessions::Notes).text())
                    .col(
                        ColumnDef::new(ChargingSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_sessions_spot")
                            .from(ChargingSessions::Table, ChargingSessions::SpotId)
                            .to(ChargingSpots::Table, ChargingSpots::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_spot_status")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::SpotId)
                    .col(ChargingSessions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChargingSessionProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessionProgress::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessionProgress::SessionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessionProgress::Soc).double().not_null())
                    .col(
                        ColumnDef::new(ChargingSessionProgress::PowerKw)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessionProgress::EnergyDeliveredKwh)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessionProgress::EstimatedMinutesRemaining).double())
                    .col(
                        ColumnDef::new(ChargingSessionProgress::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_session")
                            .from(ChargingSessionProgress::Table, ChargingSessionProgress::SessionId)
                            .to(ChargingSessions::Table, ChargingSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_progress_session_recorded")
                    .table(ChargingSessionProgress::Table)
                    .col(ChargingSessionProgress::SessionId)
                    .col(ChargingSessionProgress::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessionProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingSessions {
    Table,
    Id,
    UserId,
    VehicleId,
    SpotId,
    StationId,
    ReservationId,
    Status,
    StartTime,
    EndTime,
    InitialSoc,
    TargetSoc,
    EnergyRequestedKwh,
    EnergyDeliveredKwh,
    PricePerKwh,
    Cost,
    CurrentSoc,
    CurrentPowerKw,
    EstimatedMinutesRemaining,
    LastUpdatedAt,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
pub enum ChargingSessionProgress {
    Table,
    Id,
    SessionId,
    Soc,
    PowerKw,
    EnergyDeliveredKwh,
    EstimatedMinutesRemaining,
    RecordedAt,
}
