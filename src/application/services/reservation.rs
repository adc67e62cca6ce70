//! Reservation lifecycle

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::ports::Notifier;
use crate::config::BillingConfig;
use crate::domain::availability::TimeWindow;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::{DomainError, DomainResult, RepositoryProvider, StateKind};

/// Input for a new reservation.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub user_id: Uuid,
    pub spot_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    billing: BillingConfig,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            repos,
            notifier,
            billing,
        }
    }

    pub async fn create(&self, input: CreateReservation) -> DomainResult<Reservation> {
        let spot = self
            .repos
            .stations()
            .find_spot(input.spot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSpot", input.spot_id))?;
        let station = self
            .repos
            .stations()
            .find_station(spot.station_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", spot.station_id))?;
        if !station.is_active() {
            return Err(DomainError::InvalidState(StateKind::StationUnavailable));
        }

        if let Some(vehicle_id) = input.vehicle_id {
            if !self
                .repos
                .vehicles()
                .vehicle_belongs_to_user(vehicle_id, input.user_id)
                .await?
            {
                return Err(DomainError::Forbidden(
                    "vehicle does not belong to the caller".into(),
                ));
            }
        }

        let mut reservation = Reservation::new(
            input.user_id,
            spot.id,
            station.id,
            input.vehicle_id,
            input.start,
            input.end,
            self.billing.default_reservation_hours,
            &self.billing.confirmation_prefix,
        )?;
        reservation.notes = input.notes;
        if !TimeWindow::new(reservation.start_time, reservation.end_time).is_well_formed() {
            return Err(DomainError::Validation("end must be after start".into()));
        }

        let reservation = match self.repos.reservations().create_if_slot_free(reservation).await {
            Ok(r) => r,
            Err(e) => {
                if e.is_conflict() {
                    warn!(spot_id = %spot.id, start = %input.start, "Reservation slot conflict");
                }
                return Err(e);
            }
        };

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = %reservation.id,
            spot_id = %reservation.spot_id,
            code = %reservation.confirmation_code,
            start = %reservation.start_time,
            end = %reservation.end_time,
            "Reservation created"
        );
        self.notifier.reservation_changed(&reservation);
        Ok(reservation)
    }

    /// Unconditional status overwrite. `Ok(None)` if the reservation is missing.
    pub async fn update_status(
        &self,
        reservation_id: Uuid,
        status: ReservationStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<Reservation>> {
        let Some((previous, reservation)) = self
            .repos
            .reservations()
            .set_status(reservation_id, status, notes)
            .await?
        else {
            return Ok(None);
        };

        info!(
            reservation_id = %reservation.id,
            from = %previous,
            to = %status,
            "Reservation status overwritten"
        );
        self.notifier.reservation_changed(&reservation);
        Ok(Some(reservation))
    }

    /// Cancel on behalf of `user_id`. Returns false when the reservation is
    /// missing, owned by someone else, or already terminal.
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
        reason: Option<&str>,
    ) -> DomainResult<bool> {
        let Some(reservation) = self
            .repos
            .reservations()
            .cancel_for_user(reservation_id, user_id, reason)
            .await?
        else {
            debug!(%reservation_id, %user_id, "Cancel ignored");
            return Ok(false);
        };
        info!(%reservation_id, "Reservation cancelled");
        self.notifier.reservation_changed(&reservation);
        Ok(true)
    }

    /// Reservations starting at or after now, earliest first.
    pub async fn get_upcoming(&self, user_id: Uuid) -> DomainResult<Vec<Reservation>> {
        self.repos
            .reservations()
            .find_upcoming_for_user(user_id, Utc::now())
            .await
    }

    /// Live reservations whose window has not ended.
    pub async fn get_active(&self, user_id: Uuid) -> DomainResult<Vec<Reservation>> {
        self.repos
            .reservations()
            .find_active_for_user(user_id, Utc::now())
            .await
    }

    pub async fn get(&self, reservation_id: Uuid) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", reservation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::station::StationStatus;
    use crate::domain::ConflictKind;
    use crate::test_support::{at, fixture, pooled_fixture, Fixture};

    fn service(fx: &Fixture) -> ReservationService {
        ReservationService::new(fx.repos.clone(), fx.notifier.clone(), fx.billing.clone())
    }

    fn request(fx: &Fixture, start: u32, end: Option<u32>) -> CreateReservation {
        CreateReservation {
            user_id: fx.user_id,
            spot_id: fx.spots[0].id,
            vehicle_id: Some(fx.vehicle.id),
            start: at(start),
            end: end.map(at),
            notes: None,
        }
    }

    #[tokio::test]
    async fn half_open_boundary_scenario() {
        let fx = fixture().await;
        let svc = service(&fx);

        let a = svc.create(request(&fx, 10, Some(12))).await.unwrap();
        svc.update_status(a.id, ReservationStatus::Confirmed, None)
            .await
            .unwrap();

        let err = svc.create(request(&fx, 11, Some(13))).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::SlotConflict)));

        let b = svc.create(request(&fx, 12, Some(13))).await.unwrap();
        assert_eq!(b.status, ReservationStatus::Pending);
        assert!(b.confirmation_code.starts_with("EVR-"));
        assert_eq!(fx.notifier.count("reservation_changed"), 3);
    }

    #[tokio::test]
    async fn end_defaults_to_two_hours() {
        let fx = fixture().await;
        let r = service(&fx).create(request(&fx, 8, None)).await.unwrap();
        assert_eq!(r.end_time, at(10));
    }

    #[tokio::test]
    async fn default_end_out_of_range_is_a_validation_error() {
        let fx = fixture().await;
        let mut req = request(&fx, 10, None);
        req.start = DateTime::<Utc>::MAX_UTC;
        assert!(matches!(
            service(&fx).create(req).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(fx.notifier.count("reservation_changed"), 0);
    }

    #[tokio::test]
    async fn cancelled_reservation_frees_the_window() {
        let fx = fixture().await;
        let svc = service(&fx);
        let a = svc.create(request(&fx, 14, Some(16))).await.unwrap();
        assert!(svc.cancel(a.id, fx.user_id, Some("sick")).await.unwrap());
        svc.create(request(&fx, 15, Some(17))).await.unwrap();

        let stored = svc.get(a.id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
        assert_eq!(stored.notes.as_deref(), Some("Cancelled: sick"));
    }

    #[tokio::test]
    async fn cancel_is_silent_for_strangers_and_terminal_states() {
        let fx = fixture().await;
        let svc = service(&fx);
        let r = svc.create(request(&fx, 9, Some(10))).await.unwrap();

        assert!(!svc.cancel(r.id, fx.other_user_id, None).await.unwrap());
        assert!(!svc.cancel(Uuid::new_v4(), fx.user_id, None).await.unwrap());
        svc.update_status(r.id, ReservationStatus::Completed, None)
            .await
            .unwrap();
        assert!(!svc.cancel(r.id, fx.user_id, None).await.unwrap());
    }

    #[tokio::test]
    async fn inactive_station_is_rejected() {
        let fx = fixture().await;
        fx.set_station_status(StationStatus::Maintenance).await;
        let err = service(&fx).create(request(&fx, 10, Some(11))).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidState(StateKind::StationUnavailable)
        ));
    }

    #[tokio::test]
    async fn foreign_vehicle_is_forbidden() {
        let fx = fixture().await;
        let mut req = request(&fx, 10, Some(11));
        req.vehicle_id = Some(fx.other_vehicle.id);
        assert!(matches!(
            service(&fx).create(req).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn upcoming_is_sorted_by_start() {
        let fx = fixture().await;
        let svc = service(&fx);
        svc.create(request(&fx, 15, Some(16))).await.unwrap();
        svc.create(request(&fx, 9, Some(10))).await.unwrap();

        let upcoming = svc.get_upcoming(fx.user_id).await.unwrap();
        assert_eq!(upcoming.len(), 2);
        assert!(upcoming[0].start_time < upcoming[1].start_time);
        assert!(svc.get_upcoming(fx.other_user_id).await.unwrap().is_empty());
        assert_eq!(svc.get_active(fx.user_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancel_builds_on_the_stored_row() {
        let fx = fixture().await;
        let svc = service(&fx);
        let r = svc.create(request(&fx, 9, Some(10))).await.unwrap();
        let stale = svc.get(r.id).await.unwrap();

        svc.update_status(r.id, ReservationStatus::Confirmed, Some("bay by the door".into()))
            .await
            .unwrap();
        assert!(svc.cancel(stale.id, fx.user_id, Some("traffic")).await.unwrap());

        let stored = svc.get(r.id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
        assert_eq!(
            stored.notes.as_deref(),
            Some("bay by the door\nCancelled: traffic")
        );
    }

    #[tokio::test]
    async fn cancel_after_payment_completion_is_ignored() {
        let fx = fixture().await;
        let svc = service(&fx);
        let r = svc.create(request(&fx, 9, Some(10))).await.unwrap();
        let stale = svc.get(r.id).await.unwrap();
        assert_eq!(stale.status, ReservationStatus::Pending);

        let (previous, _) = fx
            .repos
            .reservations()
            .set_status(r.id, ReservationStatus::Completed, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(previous, ReservationStatus::Pending);

        assert!(!svc.cancel(stale.id, fx.user_id, Some("late")).await.unwrap());
        let stored = svc.get(r.id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Completed);
        assert!(stored.notes.is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_for_one_window_yield_one_reservation() {
        let fx = pooled_fixture().await;
        let svc = Arc::new(service(&fx));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let svc = svc.clone();
            let req = request(&fx, 10, Some(12));
            handles.push(tokio::spawn(async move { svc.create(req).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(
                    matches!(e, DomainError::Conflict(ConflictKind::SlotConflict))
                        || e.is_transient(),
                    "unexpected error: {e}"
                ),
            }
        }
        assert_eq!(ok, 1);
        let live = fx
            .repos
            .reservations()
            .find_live_for_spot(fx.spots[0].id)
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn update_status_of_missing_reservation_is_none() {
        let fx = fixture().await;
        let out = service(&fx)
            .update_status(Uuid::new_v4(), ReservationStatus::Confirmed, None)
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
