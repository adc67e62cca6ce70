//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Reservation, ReservationStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert `reservation` if its window is free on the spot.
    ///
    /// The overlap check covers live reservations and live bookings on the
    /// same spot and runs in the same transaction as the insert. Fails with
    /// `Conflict(SlotConflict)` when the window is taken.
    async fn create_if_slot_free(&self, reservation: Reservation) -> DomainResult<Reservation>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Reservation>>;

    /// Overwrite the status of the stored row in one transaction.
    ///
    /// Returns the previous status and the row as written, or `None` if the
    /// reservation does not exist.
    async fn set_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        notes: Option<String>,
    ) -> DomainResult<Option<(ReservationStatus, Reservation)>>;

    /// Cancel on behalf of `user_id`, deciding on the stored row inside the
    /// transaction. `None` when the reservation is missing, owned by someone
    /// else, or already Completed/Cancelled.
    async fn cancel_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
        reason: Option<&str>,
    ) -> DomainResult<Option<Reservation>>;

    /// Reservations for `user_id` starting at or after `from`, ascending by start
    async fn find_upcoming_for_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;

    /// Non-terminal reservations for `user_id` whose window ends after `now`
    async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;

    /// Non-terminal reservations on a spot
    async fn find_live_for_spot(&self, spot_id: Uuid) -> DomainResult<Vec<Reservation>>;
}
