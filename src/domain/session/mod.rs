//! Charging session aggregate
//!
//! The session entity, its progress history and the repository interface.

pub mod model;
pub mod progress;
pub mod repository;

pub use model::{estimate_time_remaining, ChargingSession, NewSession, SessionStatus};
pub use progress::{ChargingSessionProgress, ProgressReport};
pub use repository::SessionRepository;
