//! Domain layer
//!
//! Entities, pure availability rules and the repository interfaces the
//! application layer depends on. Nothing here touches the database.

pub mod availability;
pub mod booking;
pub mod events;
pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod session;
pub mod station;
pub mod vehicle;

pub use availability::{can_start_immediately, is_slot_available, SlotHolder, TimeWindow};
pub use repositories::{DomainResult, RepositoryProvider};

pub use crate::shared::errors::{ConflictKind, DomainError, StateKind};
