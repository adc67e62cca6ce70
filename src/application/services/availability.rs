//! Spot availability queries

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::availability::{can_start_immediately, is_slot_available, TimeWindow};
use crate::domain::station::ChargingSpot;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Spot plus whether a session could start on it right now.
#[derive(Debug, Clone)]
pub struct SpotAvailability {
    pub spot: ChargingSpot,
    pub can_start_now: bool,
}

pub struct AvailabilityService {
    repos: Arc<dyn RepositoryProvider>,
}

impl AvailabilityService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    async fn spot(&self, spot_id: Uuid) -> DomainResult<ChargingSpot> {
        self.repos
            .stations()
            .find_spot(spot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSpot", spot_id))
    }

    /// No live reservation or booking on the spot overlaps `[start, end)`.
    ///
    /// Advisory read; creation re-checks inside its own transaction.
    pub async fn is_slot_available(
        &self,
        spot_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let window = TimeWindow::new(start, end);
        if !window.is_well_formed() {
            return Err(DomainError::Validation("end must be after start".into()));
        }
        self.spot(spot_id).await?;

        let reservations = self.repos.reservations().find_live_for_spot(spot_id).await?;
        let bookings = self.repos.bookings().find_live_for_spot(spot_id).await?;
        Ok(is_slot_available(&reservations, &window) && is_slot_available(&bookings, &window))
    }

    pub async fn can_start_immediately(&self, spot_id: Uuid) -> DomainResult<bool> {
        let spot = self.spot(spot_id).await?;
        let open = self.repos.sessions().count_open_on_spot(spot_id).await?;
        Ok(can_start_immediately(&spot, open as usize))
    }

    pub async fn list_spots(&self, station_id: Uuid) -> DomainResult<Vec<SpotAvailability>> {
        self.repos
            .stations()
            .find_station(station_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", station_id))?;

        let spots = self.repos.stations().list_spots_by_station(station_id).await?;
        let busy: HashSet<Uuid> = self
            .repos
            .stations()
            .busy_spot_ids(station_id)
            .await?
            .into_iter()
            .collect();

        Ok(spots
            .into_iter()
            .map(|spot| {
                let open = usize::from(busy.contains(&spot.id));
                SpotAvailability {
                    can_start_now: can_start_immediately(&spot, open),
                    spot,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::NewSession;
    use crate::domain::station::SpotStatus;
    use crate::test_support::{at, fixture};

    #[tokio::test]
    async fn list_marks_busy_and_maintenance_spots() {
        let fx = fixture().await;
        let service = AvailabilityService::new(fx.repos.clone());

        fx.repos
            .sessions()
            .start(NewSession::new(fx.user_id, fx.spots[0].id))
            .await
            .unwrap();
        fx.repos
            .stations()
            .update_spot_status(fx.spots[1].id, SpotStatus::Maintenance)
            .await
            .unwrap();

        let listed = service.list_spots(fx.station.id).await.unwrap();
        let by_id = |id: Uuid| listed.iter().find(|s| s.spot.id == id).unwrap().can_start_now;
        assert!(!by_id(fx.spots[0].id));
        assert!(!by_id(fx.spots[1].id));
        assert!(by_id(fx.spots[2].id));
        assert!(!service.can_start_immediately(fx.spots[0].id).await.unwrap());
        assert!(service.can_start_immediately(fx.spots[2].id).await.unwrap());
    }

    #[tokio::test]
    async fn slot_check_rejects_inverted_window() {
        let fx = fixture().await;
        let service = AvailabilityService::new(fx.repos.clone());
        let err = service
            .is_slot_available(fx.spots[0].id, at(12), at(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_spot_is_not_found() {
        let fx = fixture().await;
        let service = AvailabilityService::new(fx.repos.clone());
        assert!(matches!(
            service.can_start_immediately(Uuid::new_v4()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
