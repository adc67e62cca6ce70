//! Vehicle directory
//!
//! Vehicles are owned by the profile service; the charging flows only ask
//! whether a vehicle belongs to the caller.

pub mod repository;

pub use repository::{Vehicle, VehicleDirectory};
