//! Payment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::services::{CallbackOutcome, PaymentIntent};
use crate::domain::payment::{PaymentTransaction, ReconcileOutcome};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    /// Pay for a reservation (exclusive with `session_id`)
    pub reservation_id: Option<Uuid>,
    /// Pay for a charging session (exclusive with `reservation_id`)
    pub session_id: Option<Uuid>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    /// VnPay, MoMo or Cash
    #[validate(length(min = 1))]
    pub method: String,
    /// Overrides the configured provider return URL
    #[validate(url)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub amount: f64,
    pub method: String,
    /// Pending, Captured or Failed
    pub status: String,
    pub provider_ref: Option<String>,
    pub provider_txn_no: Option<String>,
    pub response_code: Option<String>,
    pub bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl From<PaymentTransaction> for PaymentDto {
    fn from(p: PaymentTransaction) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            reservation_id: p.reservation_id,
            session_id: p.session_id,
            amount: p.amount,
            method: p.method.to_string(),
            status: p.status.to_string(),
            provider_ref: p.provider_ref,
            provider_txn_no: p.provider_txn_no,
            response_code: p.response_code,
            bank_code: p.bank_code,
            created_at: p.created_at,
            updated_at: p.updated_at,
            captured_at: p.captured_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentDto {
    pub payment: PaymentDto,
    /// Provider page to send the payer to; `null` for cash
    pub redirect_url: Option<String>,
}

impl From<PaymentIntent> for PaymentIntentDto {
    fn from(i: PaymentIntent) -> Self {
        Self {
            payment: i.payment.into(),
            redirect_url: i.redirect_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CallbackDto {
    pub order_ref: String,
    /// Provider reported a successful payment
    pub success: bool,
    /// `false` when this callback was a replay of an earlier one
    pub applied: bool,
}

impl From<CallbackOutcome> for CallbackDto {
    fn from(o: CallbackOutcome) -> Self {
        Self {
            order_ref: o.order_ref.to_string(),
            success: o.success,
            applied: o.outcome == ReconcileOutcome::Applied,
        }
    }
}

/// Acknowledgement VNPay expects from the IPN endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct VnPayIpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl VnPayIpnResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            rsp_code: code.to_string(),
            message: message.to_string(),
        }
    }
}
