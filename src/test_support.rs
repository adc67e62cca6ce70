//! Shared fixture for service tests: migrated database, one station with
//! three spots, two users with a vehicle each.
//!
//! `fixture()` runs on a single-connection in-memory database.
//! `pooled_fixture()` runs on a temporary SQLite file behind a real pool so
//! concurrent tests exercise separate connections and transactions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;
use uuid::Uuid;

use crate::application::ports::outbound::Notifier;
use crate::config::BillingConfig;
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::payment::PaymentTransaction;
use crate::domain::reservation::Reservation;
use crate::domain::session::ChargingSession;
use crate::domain::station::{ChargingSpot, Station, StationStatus};
use crate::domain::vehicle::Vehicle;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::entities::{booking, station};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

/// Counts notifier calls by method name.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl RecordingNotifier {
    fn hit(&self, name: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(name).or_default() += 1;
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn session_changed(&self, _: &ChargingSession) {
        self.hit("session_changed");
    }

    fn reservation_changed(&self, _: &Reservation) {
        self.hit("reservation_changed");
    }

    fn spot_status_changed(&self, _: &ChargingSpot) {
        self.hit("spot_status_changed");
    }

    fn station_availability_changed(&self, _: Uuid, _: usize, _: usize) {
        self.hit("station_availability_changed");
    }

    fn payment_updated(&self, _: &PaymentTransaction) {
        self.hit("payment_updated");
    }

    fn booking_changed(&self, _: &Booking) {
        self.hit("booking_changed");
    }
}

pub struct Fixture {
    pub db: DatabaseConnection,
    pub repos: Arc<dyn RepositoryProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub billing: BillingConfig,
    pub station: Station,
    pub spots: Vec<ChargingSpot>,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
    pub vehicle: Vehicle,
    pub other_vehicle: Vehicle,
    // Keeps the database file of a pooled fixture alive
    _dir: Option<TempDir>,
}

impl Fixture {
    pub async fn set_station_status(&self, status: StationStatus) {
        let model = station::Entity::find_by_id(self.station.id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: station::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.db).await.unwrap();
    }

    pub async fn set_booking_status(&self, booking_id: Uuid, status: BookingStatus) {
        let model = booking::Entity::find_by_id(booking_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: booking::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.db).await.unwrap();
    }
}

/// Tomorrow at `hour`:00 UTC
pub fn at(hour: u32) -> DateTime<Utc> {
    (Utc::now() + Duration::days(1))
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_utc()
}

fn vehicle(user_id: Uuid, plate: &str) -> Vehicle {
    Vehicle {
        id: Uuid::new_v4(),
        user_id,
        plate_number: plate.to_string(),
        battery_capacity_kwh: Some(60.0),
    }
}

pub async fn fixture() -> Fixture {
    seeded(&DatabaseConfig::in_memory(), None).await
}

/// Same seed data on a SQLite file with a pool of four connections.
pub async fn pooled_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evcs.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: Some(4),
    };
    seeded(&config, Some(dir)).await
}

async fn seeded(config: &DatabaseConfig, dir: Option<TempDir>) -> Fixture {
    let db = init_database(config).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    let station = Station::new("Central Depot");
    repos.stations().save_station(station.clone()).await.unwrap();

    let mut spots = Vec::new();
    for label in ["A-01", "A-02", "A-03"] {
        let spot = ChargingSpot::new(station.id, label, 3500.0);
        repos.stations().save_spot(spot.clone()).await.unwrap();
        spots.push(spot);
    }

    let user_id = Uuid::new_v4();
    let other_user_id = Uuid::new_v4();
    let vehicle_a = vehicle(user_id, "51A-123.45");
    let vehicle_b = vehicle(other_user_id, "30G-678.90");
    repos.vehicles().save(vehicle_a.clone()).await.unwrap();
    repos.vehicles().save(vehicle_b.clone()).await.unwrap();

    Fixture {
        db,
        repos,
        notifier: Arc::new(RecordingNotifier::default()),
        billing: BillingConfig::default(),
        station,
        spots,
        user_id,
        other_user_id,
        vehicle: vehicle_a,
        other_vehicle: vehicle_b,
        _dir: dir,
    }
}
