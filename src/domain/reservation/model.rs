//! Reservation domain entity

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::availability::{SlotHolder, TimeWindow};
use crate::shared::errors::DomainError;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Created, awaiting confirmation
    Pending,
    /// Confirmed by staff or payment
    Confirmed,
    /// Driver arrived and a session was started
    CheckedIn,
    /// Session paid for (terminal)
    Completed,
    /// Cancelled by user or staff (terminal)
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::CheckedIn => "CheckedIn",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses from which a session start checks the reservation in
    pub fn can_check_in(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "CheckedIn" => Ok(Self::CheckedIn),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown reservation status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A future time-window hold on a spot
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub spot_id: Uuid,
    pub station_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub confirmation_code: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// New Pending reservation. `end` defaults to `start + default_hours`;
    /// a default that leaves the representable range is a `Validation` error.
    pub fn new(
        user_id: Uuid,
        spot_id: Uuid,
        station_id: Uuid,
        vehicle_id: Option<Uuid>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        default_hours: i64,
        code_prefix: &str,
    ) -> Result<Self, DomainError> {
        let end_time = match end {
            Some(end) => end,
            None => Duration::try_hours(default_hours)
                .and_then(|hold| start.checked_add_signed(hold))
                .ok_or_else(|| {
                    DomainError::Validation("reservation end time is out of range".into())
                })?,
        };
        let id = Uuid::new_v4();
        let now = Utc::now();
        Ok(Self {
            id,
            user_id,
            vehicle_id,
            spot_id,
            station_id,
            start_time: start,
            end_time,
            status: ReservationStatus::Pending,
            confirmation_code: confirmation_code(code_prefix, id),
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_status(&mut self, status: ReservationStatus, notes: Option<String>) {
        self.status = status;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = Utc::now();
    }

    /// Cancel and append `reason` to the notes.
    pub fn cancel(&mut self, reason: Option<&str>) {
        self.status = ReservationStatus::Cancelled;
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            let line = format!("Cancelled: {}", reason.trim());
            self.notes = Some(match self.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
                _ => line,
            });
        }
        self.updated_at = Utc::now();
    }

    pub fn check_in(&mut self) {
        if self.status.can_check_in() {
            self.status = ReservationStatus::CheckedIn;
            self.updated_at = Utc::now();
        }
    }

    pub fn complete(&mut self) {
        self.status = ReservationStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

impl SlotHolder for Reservation {
    fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    fn holds_slot(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// `prefix` + first 8 hex chars of the id, upper-cased.
pub fn confirmation_code(prefix: &str, id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("{}{}", prefix, hex[..8].to_uppercase())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Reservation {
        Reservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            start,
            end,
            2,
            "EVR-",
        )
        .unwrap()
    }

    #[test]
    fn new_reservation_is_pending_with_default_window() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let r = sample(start, None);
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.end_time, start + Duration::hours(2));
        assert!(r.holds_slot());
    }

    #[test]
    fn confirmation_code_uses_id_prefix() {
        let r = sample(Utc::now(), None);
        let hex = r.id.simple().to_string()[..8].to_uppercase();
        assert_eq!(r.confirmation_code, format!("EVR-{}", hex));
        assert_eq!(r.confirmation_code.len(), 12);
    }

    #[test]
    fn cancel_appends_reason() {
        let mut r = sample(Utc::now(), None);
        r.notes = Some("Front row".into());
        r.cancel(Some("plans changed"));
        assert_eq!(r.status, ReservationStatus::Cancelled);
        assert_eq!(r.notes.as_deref(), Some("Front row\nCancelled: plans changed"));
        assert!(!r.holds_slot());
    }

    #[test]
    fn cancel_without_reason_keeps_notes() {
        let mut r = sample(Utc::now(), None);
        r.cancel(None);
        assert!(r.notes.is_none());
    }

    #[test]
    fn check_in_only_from_pending_or_confirmed() {
        let mut r = sample(Utc::now(), None);
        r.check_in();
        assert_eq!(r.status, ReservationStatus::CheckedIn);

        let mut done = sample(Utc::now(), None);
        done.complete();
        done.check_in();
        assert_eq!(done.status, ReservationStatus::Completed);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            "Expired".parse::<ReservationStatus>(),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(
            "CheckedIn".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::CheckedIn
        );
    }

    #[test]
    fn default_end_past_the_calendar_is_rejected() {
        let err = Reservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            DateTime::<Utc>::MAX_UTC,
            None,
            2,
            "EVR-",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assert!(matches!(
            Reservation::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                None,
                start,
                None,
                i64::MAX,
                "EVR-",
            ),
            Err(DomainError::Validation(_))
        ));
    }
}
