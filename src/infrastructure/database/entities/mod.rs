//! Database entities module

pub mod booking;
pub mod booking_payment;
pub mod booking_session;
pub mod charging_session;
pub mod charging_session_progress;
pub mod charging_spot;
pub mod payment_transaction;
pub mod reservation;
pub mod station;
pub mod vehicle;

pub use booking::Entity as Booking;
pub use booking_payment::Entity as BookingPayment;
pub use booking_session::Entity as BookingSession;
pub use charging_session::Entity as ChargingSession;
pub use charging_session_progress::Entity as ChargingSessionProgress;
pub use charging_spot::Entity as ChargingSpot;
pub use payment_transaction::Entity as PaymentTransaction;
pub use reservation::Entity as Reservation;
pub use station::Entity as Station;
pub use vehicle::Entity as Vehicle;
