//! Payment HTTP handlers
//!
//! Provider callbacks carry no bearer token; a valid signature is what
//! authenticates them.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::payments::momo::json_to_params;
use crate::application::services::{CallbackOutcome, CreatePaymentIntent, PaymentService};
use crate::domain::payment::{PaymentMethod, PaymentTarget, ReconcileOutcome};
use crate::domain::{DomainError, DomainResult};
use crate::interfaces::http::common::{
    client_ip, ok, ApiError, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Arc<PaymentService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Pending payment and provider redirect", body = ApiResponse<PaymentIntentDto>),
        (status = 400, description = "Invalid amount, method or target"),
        (status = 403, description = "Target belongs to another user"),
        (status = 503, description = "Provider not configured")
    )
)]
pub async fn create_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<CreatePaymentRequest>,
) -> ApiResult<PaymentIntentDto> {
    let target = match (body.reservation_id, body.session_id) {
        (Some(id), None) => PaymentTarget::Reservation(id),
        (None, Some(id)) => PaymentTarget::Session(id),
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of reservation_id and session_id is required",
            ))
        }
    };
    let method: PaymentMethod = body.method.parse()?;
    let intent = state
        .payments
        .create_intent(CreatePaymentIntent {
            user_id: user.user_id,
            target,
            amount: body.amount,
            method,
            client_ip: client_ip(&headers),
            return_url: body.return_url,
        })
        .await?;
    ok(intent.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{payment_id}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<PaymentDto>),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<PaymentDto> {
    let payment = state.payments.get(payment_id).await?;
    user.ensure_can_access(payment.user_id)?;
    ok(payment.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/cash-confirm",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Cash payment captured", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Not a cash payment"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn confirm_cash_payment(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<PaymentDto> {
    user.require_staff()?;
    let reconciled = state.payments.confirm_cash(payment_id).await?;
    ok(reconciled.payment.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/vnpay/return",
    tag = "Payment callbacks",
    responses(
        (status = 200, description = "Verified and reconciled", body = ApiResponse<CallbackDto>),
        (status = 400, description = "Bad signature or malformed parameters"),
        (status = 404, description = "Unknown order")
    )
)]
pub async fn vnpay_return(
    State(state): State<PaymentAppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<CallbackDto> {
    let outcome = state
        .payments
        .handle_callback(PaymentMethod::VnPay, &params)
        .await?;
    ok(outcome.into())
}

/// Map a reconciliation result to VNPay's IPN acknowledgement codes.
pub fn vnpay_ipn_reply(result: &DomainResult<CallbackOutcome>) -> VnPayIpnResponse {
    match result {
        Ok(o) if o.outcome == ReconcileOutcome::AlreadyProcessed => {
            VnPayIpnResponse::new("02", "Order already confirmed")
        }
        Ok(_) => VnPayIpnResponse::new("00", "Confirm Success"),
        Err(DomainError::NotFound { .. }) => VnPayIpnResponse::new("01", "Order not found"),
        Err(DomainError::Signature(_)) => VnPayIpnResponse::new("97", "Invalid signature"),
        Err(_) => VnPayIpnResponse::new("99", "Unknown error"),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/vnpay/ipn",
    tag = "Payment callbacks",
    responses(
        (status = 200, description = "Always 200; RspCode 00/02/01/97/99", body = VnPayIpnResponse)
    )
)]
pub async fn vnpay_ipn(
    State(state): State<PaymentAppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<VnPayIpnResponse> {
    let result = state
        .payments
        .handle_callback(PaymentMethod::VnPay, &params)
        .await;
    let reply = vnpay_ipn_reply(&result);
    info!(rsp_code = %reply.rsp_code, "VNPay IPN handled");
    Json(reply)
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/momo/return",
    tag = "Payment callbacks",
    responses(
        (status = 200, description = "Verified and reconciled", body = ApiResponse<CallbackDto>),
        (status = 400, description = "Bad signature or malformed parameters"),
        (status = 404, description = "Unknown order")
    )
)]
pub async fn momo_return(
    State(state): State<PaymentAppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<CallbackDto> {
    let outcome = state
        .payments
        .handle_callback(PaymentMethod::MoMo, &params)
        .await?;
    ok(outcome.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/momo/ipn",
    tag = "Payment callbacks",
    request_body = serde_json::Value,
    responses((status = 204, description = "Always 204"))
)]
pub async fn momo_ipn(State(state): State<PaymentAppState>, body: Bytes) -> StatusCode {
    let params = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(json) => json_to_params(&json),
        Err(e) => {
            warn!(error = %e, "MoMo IPN body is not JSON");
            return StatusCode::NO_CONTENT;
        }
    };
    match state
        .payments
        .handle_callback(PaymentMethod::MoMo, &params)
        .await
    {
        Ok(outcome) => info!(
            order_ref = %outcome.order_ref,
            outcome = ?outcome.outcome,
            success = outcome.success,
            "MoMo IPN handled"
        ),
        Err(e) => error!(error = %e, "MoMo IPN rejected"),
    }
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::OrderRef;

    fn outcome(outcome: ReconcileOutcome) -> DomainResult<CallbackOutcome> {
        Ok(CallbackOutcome {
            order_ref: OrderRef::Payment(Uuid::new_v4()),
            outcome,
            success: true,
        })
    }

    #[test]
    fn ipn_codes_follow_vnpay_contract() {
        assert_eq!(vnpay_ipn_reply(&outcome(ReconcileOutcome::Applied)).rsp_code, "00");
        assert_eq!(
            vnpay_ipn_reply(&outcome(ReconcileOutcome::AlreadyProcessed)).rsp_code,
            "02"
        );
        assert_eq!(
            vnpay_ipn_reply(&Err(DomainError::not_found("PaymentTransaction", 1))).rsp_code,
            "01"
        );
        assert_eq!(
            vnpay_ipn_reply(&Err(DomainError::Signature("bad".into()))).rsp_code,
            "97"
        );
        assert_eq!(
            vnpay_ipn_reply(&Err(DomainError::Validation("no order".into()))).rsp_code,
            "99"
        );
    }

    #[test]
    fn ipn_reply_uses_vnpay_field_names() {
        let json = serde_json::to_value(VnPayIpnResponse::new("00", "Confirm Success")).unwrap();
        assert_eq!(json["RspCode"], "00");
        assert_eq!(json["Message"], "Confirm Success");
    }
}
