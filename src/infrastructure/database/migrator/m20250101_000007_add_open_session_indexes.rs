//! Partial unique indexes: at most one open session per spot in each flow
//!
//! SQLite and PostgreSQL both accept `CREATE UNIQUE INDEX ... WHERE`, which
//! the schema builder cannot express, so these are raw statements.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_sessions_spot_in_progress \
             ON charging_sessions (spot_id) WHERE status = 'InProgress'",
        )
        .await?;
        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_booking_sessions_spot_active \
             ON booking_sessions (spot_id) WHERE status = 'Active'",
        )
        .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP INDEX IF EXISTS ux_booking_sessions_spot_active")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS ux_sessions_spot_in_progress")
            .await?;
        Ok(())
    }
}
