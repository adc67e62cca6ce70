//! Payment transaction domain entities

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    VnPay,
    MoMo,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VnPay => "VnPay",
            Self::MoMo => "MoMo",
            Self::Cash => "Cash",
        }
    }

    /// Methods settled through an external redirect + callback
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Cash)
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VnPay" | "vnpay" | "VNPAY" => Ok(Self::VnPay),
            "MoMo" | "momo" | "MOMO" => Ok(Self::MoMo),
            "Cash" | "cash" => Ok(Self::Cash),
            other => Err(DomainError::Validation(format!(
                "unknown payment method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Captured,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Captured => "Captured",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Status after applying an `incoming` report.
    ///
    /// Captured is final. Failed may still be upgraded to Captured (a retry
    /// on the provider side succeeded). Pending never replaces a terminal
    /// status.
    pub fn merge(self, incoming: PaymentStatus) -> PaymentStatus {
        match (self, incoming) {
            (Self::Captured, _) => Self::Captured,
            (Self::Failed, Self::Captured) => Self::Captured,
            (Self::Failed, _) => Self::Failed,
            (Self::Pending, next) => next,
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Captured" => Ok(Self::Captured),
            "Failed" => Ok(Self::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Reservation(Uuid),
    Session(Uuid),
}

/// Order reference sent to providers and echoed back in callbacks.
///
/// `P<hex>` for payment transactions, `B<hex>` for bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRef {
    Payment(Uuid),
    Booking(Uuid),
}

impl OrderRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Payment(id) | Self::Booking(id) => *id,
        }
    }
}

impl std::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payment(id) => write!(f, "P{}", id.simple()),
            Self::Booking(id) => write!(f, "B{}", id.simple()),
        }
    }
}

impl FromStr for OrderRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("malformed order reference '{}'", s));
        let (kind, rest) = match (s.get(..1), s.get(1..)) {
            (Some(kind), Some(rest)) => (kind, rest),
            _ => return Err(invalid()),
        };
        let id = Uuid::try_parse(rest).map_err(|_| invalid())?;
        match kind {
            "P" => Ok(Self::Payment(id)),
            "B" => Ok(Self::Booking(id)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Order reference given to the provider; idempotency key for callbacks
    pub provider_ref: Option<String>,
    /// Provider-side transaction number from the callback
    pub provider_txn_no: Option<String>,
    pub response_code: Option<String>,
    pub bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl PaymentTransaction {
    pub fn new(user_id: Uuid, target: PaymentTarget, amount: f64, method: PaymentMethod) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (reservation_id, session_id) = match target {
            PaymentTarget::Reservation(id) => (Some(id), None),
            PaymentTarget::Session(id) => (None, Some(id)),
        };
        Self {
            id,
            user_id,
            reservation_id,
            session_id,
            amount,
            method,
            status: PaymentStatus::Pending,
            provider_ref: method
                .is_online()
                .then(|| OrderRef::Payment(id).to_string()),
            provider_txn_no: None,
            response_code: None,
            bank_code: None,
            created_at: now,
            updated_at: now,
            captured_at: None,
        }
    }

    pub fn order_ref(&self) -> OrderRef {
        OrderRef::Payment(self.id)
    }

    /// Apply a verified provider outcome. Returns true if the row became
    /// Captured because of this call.
    pub fn apply_outcome(&mut self, outcome: &CallbackResult, now: DateTime<Utc>) -> bool {
        let before = self.status;
        if before == PaymentStatus::Captured {
            return false;
        }
        self.status = before.merge(outcome.status());
        if let Some(amount) = outcome.amount {
            if !before.is_terminal() || self.status != before {
                self.amount = amount;
            }
        }
        if outcome.transaction_no.is_some() {
            self.provider_txn_no = outcome.transaction_no.clone();
        }
        if outcome.response_code.is_some() {
            self.response_code = outcome.response_code.clone();
        }
        if outcome.bank_code.is_some() {
            self.bank_code = outcome.bank_code.clone();
        }
        self.updated_at = now;
        let newly_captured = self.status == PaymentStatus::Captured;
        if newly_captured {
            self.captured_at = Some(now);
        }
        newly_captured
    }

    /// Staff-confirmed cash capture
    pub fn capture(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == PaymentStatus::Captured {
            return false;
        }
        self.status = PaymentStatus::Captured;
        self.captured_at = Some(now);
        self.updated_at = now;
        true
    }
}

/// Parsed and verified provider callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    pub provider: PaymentMethod,
    /// Signature matched and the provider reported success
    pub success: bool,
    pub signature_valid: bool,
    pub order_ref: String,
    pub amount: Option<f64>,
    pub transaction_no: Option<String>,
    pub response_code: Option<String>,
    pub bank_code: Option<String>,
}

impl CallbackResult {
    /// Status this callback reports. Only meaningful when the signature is valid.
    pub fn status(&self) -> PaymentStatus {
        if self.success {
            PaymentStatus::Captured
        } else {
            PaymentStatus::Failed
        }
    }

    pub fn parsed_order_ref(&self) -> Result<OrderRef, DomainError> {
        self.order_ref.parse()
    }
}

/// What reconciliation did with a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// State changed (first delivery or upgrade)
    Applied,
    /// Replay of an already-terminal outcome; nothing changed
    AlreadyProcessed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(success: bool, amount: Option<f64>) -> CallbackResult {
        CallbackResult {
            provider: PaymentMethod::VnPay,
            success,
            signature_valid: true,
            order_ref: "P00000000000000000000000000000001".into(),
            amount,
            transaction_no: Some("14123456".into()),
            response_code: Some(if success { "00" } else { "24" }.into()),
            bank_code: Some("NCB".into()),
        }
    }

    #[test]
    fn captured_is_sticky() {
        assert_eq!(PaymentStatus::Captured.merge(PaymentStatus::Failed), PaymentStatus::Captured);
        assert_eq!(PaymentStatus::Captured.merge(PaymentStatus::Pending), PaymentStatus::Captured);
        assert_eq!(PaymentStatus::Failed.merge(PaymentStatus::Captured), PaymentStatus::Captured);
        assert_eq!(PaymentStatus::Failed.merge(PaymentStatus::Pending), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::Pending.merge(PaymentStatus::Failed), PaymentStatus::Failed);
    }

    #[test]
    fn order_ref_round_trips_and_rejects_garbage() {
        let id = Uuid::new_v4();
        let r = OrderRef::Booking(id);
        assert_eq!(r.to_string().parse::<OrderRef>().unwrap(), r);
        assert!("X123".parse::<OrderRef>().is_err());
        assert!("".parse::<OrderRef>().is_err());
        assert!("Pnot-a-uuid".parse::<OrderRef>().is_err());
    }

    #[test]
    fn online_payment_gets_provider_ref() {
        let p = PaymentTransaction::new(
            Uuid::new_v4(),
            PaymentTarget::Session(Uuid::new_v4()),
            35_000.0,
            PaymentMethod::MoMo,
        );
        assert_eq!(p.provider_ref, Some(format!("P{}", p.id.simple())));

        let cash = PaymentTransaction::new(
            Uuid::new_v4(),
            PaymentTarget::Session(Uuid::new_v4()),
            35_000.0,
            PaymentMethod::Cash,
        );
        assert!(cash.provider_ref.is_none());
    }

    #[test]
    fn replayed_capture_is_reported_once() {
        let mut p = PaymentTransaction::new(
            Uuid::new_v4(),
            PaymentTarget::Session(Uuid::new_v4()),
            35_000.0,
            PaymentMethod::VnPay,
        );
        assert!(p.apply_outcome(&callback(true, Some(35_000.0)), Utc::now()));
        let captured_at = p.captured_at;
        assert!(!p.apply_outcome(&callback(true, Some(35_000.0)), Utc::now()));
        assert!(!p.apply_outcome(&callback(false, Some(1.0)), Utc::now()));
        assert_eq!(p.status, PaymentStatus::Captured);
        assert_eq!(p.amount, 35_000.0);
        assert_eq!(p.captured_at, captured_at);
    }
}
