//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::session::SessionRepository;
use crate::domain::station::StationRepository;
use crate::domain::vehicle::VehicleDirectory;

use super::booking_repository::SeaOrmBookingRepository;
use super::payment_repository::SeaOrmPaymentRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::station_repository::SeaOrmStationRepository;
use super::vehicle_repository::SeaOrmVehicleDirectory;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let spot = repos.stations().find_spot(spot_id).await?;
/// let session = repos.sessions().start(NewSession::new(user_id, spot_id)).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    stations: SeaOrmStationRepository,
    vehicles: SeaOrmVehicleDirectory,
    reservations: SeaOrmReservationRepository,
    sessions: SeaOrmSessionRepository,
    payments: SeaOrmPaymentRepository,
    bookings: SeaOrmBookingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            stations: SeaOrmStationRepository::new(db.clone()),
            vehicles: SeaOrmVehicleDirectory::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn vehicles(&self) -> &dyn VehicleDirectory {
        &self.vehicles
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }
}
