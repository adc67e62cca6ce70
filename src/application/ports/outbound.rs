//! Outbound ports: side effects the application layer triggers
//!
//! [`Notifier`] is the realtime push sink. Services call it only after
//! the database transaction has committed. Implementations must not block
//! and must swallow their own failures (logging them), since a lost push
//! never rolls back a committed change.

use crate::domain::booking::Booking;
use crate::domain::payment::PaymentTransaction;
use crate::domain::reservation::Reservation;
use crate::domain::session::ChargingSession;
use crate::domain::station::ChargingSpot;

pub trait Notifier: Send + Sync {
    fn session_changed(&self, session: &ChargingSession);

    fn reservation_changed(&self, reservation: &Reservation);

    fn spot_status_changed(&self, spot: &ChargingSpot);

    fn station_availability_changed(
        &self,
        station_id: uuid::Uuid,
        available_spots: usize,
        total_spots: usize,
    );

    fn payment_updated(&self, payment: &PaymentTransaction);

    fn booking_changed(&self, booking: &Booking);
}

/// Notifier that drops everything (CLI checks, tests)
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn session_changed(&self, _: &ChargingSession) {}
    fn reservation_changed(&self, _: &Reservation) {}
    fn spot_status_changed(&self, _: &ChargingSpot) {}
    fn station_availability_changed(&self, _: uuid::Uuid, _: usize, _: usize) {}
    fn payment_updated(&self, _: &PaymentTransaction) {}
    fn booking_changed(&self, _: &Booking) {}
}
