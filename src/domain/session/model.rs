//! Charging session domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::station::ChargingSpot;
use crate::shared::errors::{DomainError, StateKind};
use crate::shared::money::{apply_base_fee, energy_cost};

/// Session status. `InProgress` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Failed" => Ok(Self::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown session status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for starting a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub spot_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub initial_soc: Option<f64>,
    pub target_soc: Option<f64>,
    pub energy_requested_kwh: Option<f64>,
}

impl NewSession {
    pub fn new(user_id: Uuid, spot_id: Uuid) -> Self {
        Self {
            user_id,
            spot_id,
            vehicle_id: None,
            reservation_id: None,
            initial_soc: None,
            target_soc: None,
            energy_requested_kwh: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChargingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub spot_id: Uuid,
    pub station_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub initial_soc: f64,
    pub target_soc: f64,
    pub energy_requested_kwh: Option<f64>,
    pub energy_delivered_kwh: f64,
    /// Spot price captured when the session started
    pub price_per_kwh: f64,
    pub cost: Option<f64>,
    pub current_soc: Option<f64>,
    pub current_power_kw: Option<f64>,
    pub estimated_minutes_remaining: Option<f64>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChargingSession {
    /// Open an InProgress session on `spot`, snapshotting its price.
    pub fn start(request: &NewSession, spot: &ChargingSpot, now: DateTime<Utc>) -> Self {
        let initial_soc = request.initial_soc.unwrap_or(0.0);
        Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            vehicle_id: request.vehicle_id,
            spot_id: spot.id,
            station_id: spot.station_id,
            reservation_id: request.reservation_id,
            status: SessionStatus::InProgress,
            start_time: now,
            end_time: None,
            initial_soc,
            target_soc: request.target_soc.unwrap_or(100.0),
            energy_requested_kwh: request.energy_requested_kwh,
            energy_delivered_kwh: 0.0,
            price_per_kwh: spot.price_per_kwh,
            cost: None,
            current_soc: Some(initial_soc),
            current_power_kw: None,
            estimated_minutes_remaining: None,
            last_updated_at: Some(now),
            notes: None,
            created_at: now,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    fn ensure_in_progress(&self) -> Result<(), DomainError> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(DomainError::InvalidState(StateKind::SessionNotInProgress))
        }
    }

    /// Finalise as Completed.
    ///
    /// Without an explicit `cost` the bill is `energy * price`, where price is
    /// `price_override` or the start-time snapshot. The result never drops
    /// below `base_fee`.
    pub fn complete(
        &mut self,
        energy_delivered_kwh: f64,
        cost: Option<f64>,
        price_override: Option<f64>,
        notes: Option<String>,
        base_fee: f64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_in_progress()?;
        if energy_delivered_kwh < 0.0 {
            return Err(DomainError::Validation(
                "energy delivered must not be negative".into(),
            ));
        }
        let price = price_override.unwrap_or(self.price_per_kwh);
        let raw = cost.unwrap_or_else(|| energy_cost(price, energy_delivered_kwh));

        self.energy_delivered_kwh = energy_delivered_kwh;
        self.cost = Some(apply_base_fee(raw, base_fee));
        self.status = SessionStatus::Completed;
        self.end_time = Some(now);
        self.estimated_minutes_remaining = None;
        self.last_updated_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }

    /// Status overwrite used by staff.
    ///
    /// Terminal statuses close the session (end time set if missing); any
    /// other status only touches the notes. Returns whether the session was
    /// closed by this call.
    pub fn overwrite_status(
        &mut self,
        status: SessionStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if notes.is_some() {
            self.notes = notes;
        }
        if !status.is_terminal() {
            return false;
        }
        let was_open = self.is_in_progress();
        self.status = status;
        if self.end_time.is_none() {
            self.end_time = Some(now);
        }
        self.last_updated_at = Some(now);
        was_open
    }

    /// Overwrite the live progress fields.
    pub fn apply_progress(
        &mut self,
        soc: f64,
        power_kw: f64,
        energy_delivered_kwh: f64,
        estimated_minutes_remaining: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_in_progress()?;
        self.current_soc = Some(soc);
        self.current_power_kw = Some(power_kw);
        self.energy_delivered_kwh = energy_delivered_kwh;
        self.estimated_minutes_remaining =
            estimated_minutes_remaining.or_else(|| self.estimate_time_remaining());
        self.last_updated_at = Some(now);
        Ok(())
    }

    pub fn estimate_time_remaining(&self) -> Option<f64> {
        estimate_time_remaining(self.current_soc, Some(self.target_soc), self.current_power_kw)
    }
}

/// Minutes left under a linear charge model.
///
/// `None` when any input is missing or power is not positive; `0` once the
/// target SOC is reached.
pub fn estimate_time_remaining(
    current_soc: Option<f64>,
    target_soc: Option<f64>,
    current_power_kw: Option<f64>,
) -> Option<f64> {
    let (current, target, power) = (current_soc?, target_soc?, current_power_kw?);
    if power <= 0.0 {
        return None;
    }
    let gap = target - current;
    if gap <= 0.0 {
        return Some(0.0);
    }
    Some(gap / 100.0 * 60.0 / power)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn spot(price: f64) -> ChargingSpot {
        ChargingSpot::new(Uuid::new_v4(), "A-01", price)
    }

    fn open(price: f64) -> ChargingSession {
        ChargingSession::start(&NewSession::new(Uuid::new_v4(), Uuid::new_v4()), &spot(price), Utc::now())
    }

    #[test]
    fn start_applies_defaults_and_snapshots_price() {
        let s = open(3500.0);
        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.initial_soc, 0.0);
        assert_eq!(s.target_soc, 100.0);
        assert_eq!(s.price_per_kwh, 3500.0);
        assert!(s.end_time.is_none());
    }

    #[test]
    fn complete_uses_snapshot_price() {
        let mut s = open(3500.0);
        s.complete(10.0, None, None, None, 10_000.0, Utc::now()).unwrap();
        assert_eq!(s.cost, Some(35_000.0));
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(s.end_time.is_some());
    }

    #[test]
    fn complete_clamps_to_base_fee() {
        let mut s = open(3500.0);
        s.complete(0.1, None, None, None, 10_000.0, Utc::now()).unwrap();
        assert_eq!(s.cost, Some(10_000.0));

        let mut explicit = open(3500.0);
        explicit
            .complete(1.0, Some(2_500.0), None, None, 10_000.0, Utc::now())
            .unwrap();
        assert_eq!(explicit.cost, Some(10_000.0));
    }

    #[test]
    fn complete_twice_is_rejected() {
        let mut s = open(3500.0);
        s.complete(5.0, None, None, None, 10_000.0, Utc::now()).unwrap();
        let err = s
            .complete(5.0, None, None, None, 10_000.0, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidState(StateKind::SessionNotInProgress)
        ));
    }

    #[test]
    fn overwrite_with_non_terminal_only_touches_notes() {
        let mut s = open(3500.0);
        let closed = s.overwrite_status(SessionStatus::InProgress, Some("check cable".into()), Utc::now());
        assert!(!closed);
        assert!(s.is_in_progress());
        assert_eq!(s.notes.as_deref(), Some("check cable"));
    }

    #[test]
    fn overwrite_with_terminal_keeps_existing_end_time() {
        let mut s = open(3500.0);
        let earlier = Utc::now() - Duration::minutes(5);
        s.end_time = Some(earlier);
        assert!(s.overwrite_status(SessionStatus::Failed, None, Utc::now()));
        assert_eq!(s.end_time, Some(earlier));
        assert_eq!(s.status, SessionStatus::Failed);
    }

    #[test]
    fn estimate_formula() {
        assert_eq!(estimate_time_remaining(Some(20.0), Some(80.0), Some(30.0)), Some(1.2));
        assert_eq!(estimate_time_remaining(Some(90.0), Some(80.0), Some(30.0)), Some(0.0));
        assert_eq!(estimate_time_remaining(Some(20.0), Some(80.0), Some(0.0)), None);
        assert_eq!(estimate_time_remaining(None, Some(80.0), Some(30.0)), None);
    }

    #[test]
    fn progress_fills_missing_estimate() {
        let mut s = open(3500.0);
        s.apply_progress(50.0, 25.0, 12.0, None, Utc::now()).unwrap();
        assert_eq!(s.current_soc, Some(50.0));
        assert_eq!(s.energy_delivered_kwh, 12.0);
        assert_eq!(s.estimated_minutes_remaining, Some(1.2));

        s.apply_progress(60.0, 25.0, 14.0, Some(45.0), Utc::now()).unwrap();
        assert_eq!(s.estimated_minutes_remaining, Some(45.0));
    }
}
