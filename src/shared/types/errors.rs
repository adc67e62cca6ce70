use thiserror::Error;

/// Concurrent state change detected at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Requested window overlaps a live reservation or booking on the spot
    SlotConflict,
    /// The spot already has a charging session in progress
    SpotBusy,
    /// A unique key (confirmation code, provider reference) is already taken
    Duplicate,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SlotConflict => "SLOT_CONFLICT",
            Self::SpotBusy => "SPOT_BUSY",
            Self::Duplicate => "DUPLICATE",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlotConflict => write!(f, "time slot overlaps an existing reservation"),
            Self::SpotBusy => write!(f, "spot already has a session in progress"),
            Self::Duplicate => write!(f, "duplicate unique key"),
        }
    }
}

/// Business rule that blocks an action until preconditions change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    StationUnavailable,
    SpotNotAvailable,
    PaymentRequired,
    SessionNotInProgress,
    BookingCancelled,
}

impl StateKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StationUnavailable => "STATION_UNAVAILABLE",
            Self::SpotNotAvailable => "SPOT_NOT_AVAILABLE",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::SessionNotInProgress => "SESSION_NOT_IN_PROGRESS",
            Self::BookingCancelled => "BOOKING_CANCELLED",
        }
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StationUnavailable => write!(f, "station is not active"),
            Self::SpotNotAvailable => write!(f, "spot is not available"),
            Self::PaymentRequired => write!(f, "a successful payment is required first"),
            Self::SessionNotInProgress => write!(f, "session is not in progress"),
            Self::BookingCancelled => write!(f, "booking is cancelled"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Invalid state: {0}")]
    InvalidState(StateKind),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field: "id",
            value: value.to_string(),
        }
    }

    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(kind) => kind.code(),
            Self::InvalidState(kind) => kind.code(),
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Signature(_) => "SIGNATURE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Conflict(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        DomainError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_are_distinct() {
        assert_eq!(
            DomainError::Conflict(ConflictKind::SlotConflict).code(),
            "SLOT_CONFLICT"
        );
        assert_eq!(DomainError::Conflict(ConflictKind::SpotBusy).code(), "SPOT_BUSY");
    }

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(DomainError::Storage("db gone".into()).is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
        assert!(!DomainError::Conflict(ConflictKind::SpotBusy).is_transient());
    }

    #[test]
    fn not_found_display() {
        let e = DomainError::not_found("Reservation", "abc");
        assert_eq!(e.to_string(), "Not found: Reservation with id=abc");
    }
}
