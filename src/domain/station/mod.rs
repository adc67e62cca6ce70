//! Station / spot directory
//!
//! Stations and spots are maintained elsewhere; this aggregate exposes the
//! read-side lookups the reservation and session flows depend on.

pub mod model;
pub mod repository;

pub use model::{ChargingSpot, SpotStatus, Station, StationStatus};
pub use repository::StationRepository;
