//! Station / spot repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{ChargingSpot, SpotStatus, Station};
use crate::domain::DomainResult;

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn find_station(&self, id: Uuid) -> DomainResult<Option<Station>>;

    async fn find_spot(&self, id: Uuid) -> DomainResult<Option<ChargingSpot>>;

    async fn list_spots_by_station(&self, station_id: Uuid) -> DomainResult<Vec<ChargingSpot>>;

    /// Insert a station (directory seeding / tests)
    async fn save_station(&self, station: Station) -> DomainResult<()>;

    /// Insert a spot (directory seeding / tests)
    async fn save_spot(&self, spot: ChargingSpot) -> DomainResult<()>;

    /// Change the published price. Running sessions keep their snapshot.
    async fn update_spot_price(&self, spot_id: Uuid, price_per_kwh: f64) -> DomainResult<()>;

    /// Operator status change (Maintenance / Offline / Available)
    async fn update_spot_status(&self, spot_id: Uuid, status: SpotStatus) -> DomainResult<()>;

    /// Spot ids of `station_id` that currently have a session in progress
    async fn busy_spot_ids(&self, station_id: Uuid) -> DomainResult<Vec<Uuid>>;
}
