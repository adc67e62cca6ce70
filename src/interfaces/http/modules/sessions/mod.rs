//! Charging session endpoints: start, scan, complete, progress

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
