//! Booking flow entities: booking, its lightweight session and payments

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::availability::{SlotHolder, TimeWindow};
use crate::domain::payment::{OrderRef, PaymentMethod};
use crate::shared::errors::DomainError;
use crate::shared::money::energy_cost;

macro_rules! string_enum {
    ($name:ident, $label:literal { $($variant:ident),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        concat!("unknown ", $label, " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

string_enum!(BookingStatus, "booking status" { Pending, Confirmed, Cancelled });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingSessionStatus {
    Active,
    Completed,
}

string_enum!(BookingSessionStatus, "booking session status" { Active, Completed });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingPaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

string_enum!(BookingPaymentStatus, "booking payment status" { Pending, Succeeded, Failed });

impl BookingPaymentStatus {
    /// Succeeded is final; Failed can still become Succeeded.
    pub fn merge(self, incoming: BookingPaymentStatus) -> BookingPaymentStatus {
        match (self, incoming) {
            (Self::Succeeded, _) => Self::Succeeded,
            (Self::Failed, Self::Succeeded) => Self::Succeeded,
            (Self::Failed, _) => Self::Failed,
            (Self::Pending, next) => next,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub station_id: Uuid,
    pub spot_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        vehicle_id: Uuid,
        station_id: Uuid,
        spot_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::Validation(
                "booking end must be after start".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            vehicle_id,
            station_id,
            spot_id,
            start_time: start,
            end_time: end,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        })
    }

    pub fn order_ref(&self) -> OrderRef {
        OrderRef::Booking(self.id)
    }
}

impl SlotHolder for Booking {
    fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    fn holds_slot(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

/// Session started from a booking. Price is fixed when it starts.
#[derive(Debug, Clone)]
pub struct BookingSession {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub spot_id: Uuid,
    pub price_per_kwh: f64,
    pub status: BookingSessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub energy_kwh: Option<f64>,
    pub cost: Option<f64>,
}

impl BookingSession {
    pub fn start(booking: &Booking, price_per_kwh: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            spot_id: booking.spot_id,
            price_per_kwh,
            status: BookingSessionStatus::Active,
            start_time: now,
            end_time: None,
            energy_kwh: None,
            cost: None,
        }
    }

    /// Close with `cost = round(price * kWh, 2)`. Returns false if already closed.
    pub fn end(&mut self, energy_kwh: f64, now: DateTime<Utc>) -> bool {
        if self.status != BookingSessionStatus::Active {
            return false;
        }
        self.energy_kwh = Some(energy_kwh);
        self.cost = Some(energy_cost(self.price_per_kwh, energy_kwh));
        self.status = BookingSessionStatus::Completed;
        self.end_time = Some(now);
        true
    }
}

#[derive(Debug, Clone)]
pub struct BookingPayment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub provider: PaymentMethod,
    pub amount: f64,
    pub status: BookingPaymentStatus,
    pub bank_code: Option<String>,
    pub txn_ref: Option<String>,
    pub txn_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome reported for a booking, from a provider callback or a direct call.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub booking_id: Uuid,
    pub provider: PaymentMethod,
    pub success: bool,
    pub amount: f64,
    pub bank_code: Option<String>,
    pub txn_ref: Option<String>,
    pub txn_no: Option<String>,
}

impl ProviderResult {
    pub fn status(&self) -> BookingPaymentStatus {
        if self.success {
            BookingPaymentStatus::Succeeded
        } else {
            BookingPaymentStatus::Failed
        }
    }
}

impl BookingPayment {
    pub fn from_result(result: &ProviderResult, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: result.booking_id,
            provider: result.provider,
            amount: result.amount,
            status: result.status(),
            bank_code: result.bank_code.clone(),
            txn_ref: result.txn_ref.clone(),
            txn_no: result.txn_no.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a repeated result into this row. Returns true if anything changed.
    pub fn apply(&mut self, result: &ProviderResult, now: DateTime<Utc>) -> bool {
        if self.status == BookingPaymentStatus::Succeeded {
            return false;
        }
        let next = self.status.merge(result.status());
        let changed = next != self.status
            || self.amount != result.amount
            || (result.txn_no.is_some() && self.txn_no != result.txn_no);
        self.status = next;
        self.amount = result.amount;
        if result.bank_code.is_some() {
            self.bank_code = result.bank_code.clone();
        }
        if self.txn_ref.is_none() {
            self.txn_ref = result.txn_ref.clone();
        }
        if result.txn_no.is_some() {
            self.txn_no = result.txn_no.clone();
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking() -> Booking {
        let start = Utc::now();
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            start,
            start + Duration::hours(1),
        )
        .unwrap()
    }

    fn result(success: bool) -> ProviderResult {
        ProviderResult {
            booking_id: Uuid::new_v4(),
            provider: PaymentMethod::VnPay,
            success,
            amount: 50_000.0,
            bank_code: None,
            txn_ref: Some("Babc".into()),
            txn_no: Some("1".into()),
        }
    }

    #[test]
    fn booking_requires_ordered_window() {
        let now = Utc::now();
        let err = Booking::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), now, now)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cancelled_booking_releases_slot() {
        let mut b = booking();
        assert!(b.holds_slot());
        b.status = BookingStatus::Cancelled;
        assert!(!b.holds_slot());
    }

    #[test]
    fn session_cost_is_rounded_to_cents() {
        let b = booking();
        let mut s = BookingSession::start(&b, 3456.78, Utc::now());
        assert!(s.end(2.5, Utc::now()));
        assert_eq!(s.cost, Some(8641.95));
        assert!(!s.end(2.0, Utc::now()));
        assert_eq!(s.energy_kwh, Some(2.5));
    }

    #[test]
    fn succeeded_payment_ignores_replays() {
        let mut p = BookingPayment::from_result(&result(true), Utc::now());
        assert!(!p.apply(&result(false), Utc::now()));
        assert_eq!(p.status, BookingPaymentStatus::Succeeded);
    }

    #[test]
    fn failed_payment_upgrades() {
        let mut p = BookingPayment::from_result(&result(false), Utc::now());
        assert!(p.apply(&result(true), Utc::now()));
        assert_eq!(p.status, BookingPaymentStatus::Succeeded);
    }

    #[test]
    fn status_strings_parse() {
        assert_eq!("Active".parse::<BookingSessionStatus>().unwrap(), BookingSessionStatus::Active);
        assert!("Paid".parse::<BookingPaymentStatus>().is_err());
        assert_eq!(BookingStatus::Confirmed.to_string(), "Confirmed");
    }
}
