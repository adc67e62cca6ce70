//! Booking repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Booking, BookingPayment, BookingSession, ProviderResult};
use crate::domain::payment::ReconcileOutcome;
use crate::domain::DomainResult;

/// Booking payment row after an upsert.
#[derive(Debug, Clone)]
pub struct RecordedPayment {
    pub payment: BookingPayment,
    pub outcome: ReconcileOutcome,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert `booking` if no live booking or reservation on the spot
    /// overlaps it (`Conflict(SlotConflict)` otherwise), in one transaction.
    async fn create_if_slot_free(&self, booking: Booking) -> DomainResult<Booking>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>>;

    /// Non-cancelled bookings on a spot
    async fn find_live_for_spot(&self, spot_id: Uuid) -> DomainResult<Vec<Booking>>;

    /// Start the booking's session in one transaction.
    ///
    /// Check order: booking not Cancelled (`BookingCancelled`), a Succeeded
    /// payment exists when `prepay_required` (`PaymentRequired`), no open
    /// session on the spot in either flow (`SpotBusy`), spot Available
    /// (`SpotNotAvailable`). Then the session is inserted, the spot becomes
    /// Occupied and the booking Confirmed.
    async fn start_session(
        &self,
        booking_id: Uuid,
        prepay_required: bool,
    ) -> DomainResult<BookingSession>;

    /// Close the session and release its spot. `Ok(None)` if the session
    /// does not exist or is already closed.
    async fn end_session(
        &self,
        session_id: Uuid,
        energy_kwh: f64,
    ) -> DomainResult<Option<BookingSession>>;

    async fn find_session(&self, id: Uuid) -> DomainResult<Option<BookingSession>>;

    /// Upsert keyed by `txn_ref`, falling back to the booking id.
    /// `Ok(None)` if the booking does not exist.
    async fn record_provider_result(
        &self,
        result: &ProviderResult,
    ) -> DomainResult<Option<RecordedPayment>>;

    async fn payments_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<BookingPayment>>;
}
