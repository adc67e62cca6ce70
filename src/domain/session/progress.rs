//! Append-only progress history

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Immutable snapshot of a session's live values at `recorded_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSessionProgress {
    /// Assigned by storage; `None` until persisted
    pub id: Option<i64>,
    pub session_id: Uuid,
    pub soc: f64,
    pub power_kw: f64,
    pub energy_delivered_kwh: f64,
    pub estimated_minutes_remaining: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// A progress report as received from the charger or the operator.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReport {
    pub soc: f64,
    pub power_kw: f64,
    pub energy_delivered_kwh: f64,
    pub estimated_minutes_remaining: Option<f64>,
}

impl ProgressReport {
    pub fn validate(&self) -> Result<(), crate::shared::errors::DomainError> {
        use crate::shared::errors::DomainError;

        if !(0.0..=100.0).contains(&self.soc) {
            return Err(DomainError::Validation("soc must be within 0..=100".into()));
        }
        if self.power_kw < 0.0 || self.energy_delivered_kwh < 0.0 {
            return Err(DomainError::Validation(
                "power and energy must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl ChargingSessionProgress {
    pub fn record(
        session_id: Uuid,
        report: &ProgressReport,
        estimated_minutes_remaining: Option<f64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            session_id,
            soc: report.soc,
            power_kw: report.power_kw,
            energy_delivered_kwh: report.energy_delivered_kwh,
            estimated_minutes_remaining,
            recorded_at: now,
        }
    }

    /// Push `recorded_at` forward to `last` if the clock went backwards.
    pub fn not_before(mut self, last: Option<DateTime<Utc>>) -> Self {
        if let Some(last) = last {
            if last > self.recorded_at {
                self.recorded_at = last;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn report() -> ProgressReport {
        ProgressReport {
            soc: 40.0,
            power_kw: 22.0,
            energy_delivered_kwh: 8.5,
            estimated_minutes_remaining: None,
        }
    }

    #[test]
    fn recorded_at_never_goes_backwards() {
        let now = Utc::now();
        let later = now + Duration::seconds(30);
        let row = ChargingSessionProgress::record(Uuid::new_v4(), &report(), None, now)
            .not_before(Some(later));
        assert_eq!(row.recorded_at, later);

        let row = ChargingSessionProgress::record(Uuid::new_v4(), &report(), None, later)
            .not_before(Some(now));
        assert_eq!(row.recorded_at, later);

        let row = ChargingSessionProgress::record(Uuid::new_v4(), &report(), None, now)
            .not_before(None);
        assert_eq!(row.recorded_at, now);
    }

    #[test]
    fn out_of_range_soc_is_rejected() {
        let mut r = report();
        r.soc = 120.0;
        assert!(r.validate().is_err());
        r.soc = 100.0;
        assert!(r.validate().is_ok());
    }
}
