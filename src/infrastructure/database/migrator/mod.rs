//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_stations;
mod m20250101_000002_create_vehicles;
mod m20250101_000003_create_reservations;
mod m20250101_000004_create_charging_sessions;
mod m20250101_000005_create_payment_transactions;
mod m20250101_000006_create_bookings;
mod m20250101_000007_add_open_session_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_stations::Migration),
            Box::new(m20250101_000002_create_vehicles::Migration),
            Box::new(m20250101_000003_create_reservations::Migration),
            Box::new(m20250101_000004_create_charging_sessions::Migration),
            Box::new(m20250101_000005_create_payment_transactions::Migration),
            Box::new(m20250101_000006_create_bookings::Migration),
            Box::new(m20250101_000007_add_open_session_indexes::Migration),
        ]
    }
}
