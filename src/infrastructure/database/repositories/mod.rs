//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod payment_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod session_repository;
pub mod station_repository;
pub mod vehicle_repository;

mod spot_state;

pub use repository_provider::SeaOrmRepositoryProvider;

use std::str::FromStr;

use sea_orm::{DbErr, SqlErr};

use crate::domain::{ConflictKind, DomainError};

/// Map a database error into the domain taxonomy.
///
/// Unique violations become conflicts: the open-session indexes mean the
/// spot is busy, any other unique key is a duplicate.
pub(crate) fn db_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => {
            if is_open_session_index(&msg) {
                DomainError::Conflict(ConflictKind::SpotBusy)
            } else {
                DomainError::Conflict(ConflictKind::Duplicate)
            }
        }
        _ => DomainError::Storage(format!("Database error: {}", e)),
    }
}

// SQLite names the column, PostgreSQL names the index
fn is_open_session_index(msg: &str) -> bool {
    msg.contains("ux_sessions_spot_in_progress")
        || msg.contains("ux_booking_sessions_spot_active")
        || msg.contains("charging_sessions.spot_id")
        || msg.contains("booking_sessions.spot_id")
}

/// Parse a stored enum column.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|_| DomainError::Storage(format!("unexpected stored value '{}'", value)))
}
