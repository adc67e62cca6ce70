//! Booking aggregate (pay-per-use flow)

pub mod model;
pub mod repository;

pub use model::{
    Booking, BookingPayment, BookingPaymentStatus, BookingSession, BookingSessionStatus,
    BookingStatus, ProviderResult,
};
pub use repository::{BookingRepository, RecordedPayment};
