//! Create stations and charging_spots tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stations::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Stations::Name).string().not_null())
                    .col(ColumnDef::new(Stations::Address).string())
                    .col(
                        ColumnDef::new(Stations::Status)
                            .string()
                            .not_null()
                            .default("Active"),
                    )
                    .col(
                        ColumnDef::new(Stations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChargingSpots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSpots::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSpots::StationId).uuid().not_null())
                    .col(ColumnDef::new(ChargingSpots::Label).string().not_null())
                    .col(ColumnDef::new(ChargingSpots::ConnectorType).string())
                    .col(ColumnDef::new(ChargingSpots::PowerKw).double())
                    .col(
                        ColumnDef::new(ChargingSpots::Status)
                            .string()
                            .not_null()
                            .default("Available"),
                    )
                    .col(
                        ColumnDef::new(ChargingSpots::PricePerKwh)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSpots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_spots_station")
                            .from(ChargingSpots::Table, ChargingSpots::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_spots_station")
                    .table(ChargingSpots::Table)
                    .col(ChargingSpots::StationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSpots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Stations {
    Table,
    Id,
    Name,
    Address,
    Status,
    CreatedAt,
}

#[derive(Iden)]
pub enum ChargingSpots {
    Table,
    Id,
    StationId,
    Label,
    ConnectorType,
    PowerKw,
    Status,
    PricePerKwh,
    UpdatedAt,
}
