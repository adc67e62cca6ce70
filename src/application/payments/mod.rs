//! Payment provider gateways
//!
//! Each gateway knows its provider's canonical signing rules: how to build
//! a signed redirect URL for a new order and how to verify a callback.
//! Neither touches storage; reconciliation lives in `PaymentService`.

pub mod momo;
pub mod signing;
pub mod vnpay;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::payment::{CallbackResult, OrderRef, PaymentMethod};
use crate::domain::DomainResult;

pub use momo::MomoGateway;
pub use vnpay::VnPayGateway;

/// Order details a gateway needs to produce a redirect URL.
#[derive(Debug, Clone)]
pub struct RedirectRequest {
    pub order_ref: OrderRef,
    /// Amount in currency units (VND)
    pub amount: f64,
    pub order_info: String,
    pub client_ip: String,
    /// Overrides the configured return URL when set
    pub return_url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Signed URL the payer is redirected to.
    ///
    /// Fails with `Configuration` when required provider settings are missing.
    async fn build_redirect_url(&self, request: &RedirectRequest) -> DomainResult<String>;

    /// Verify a callback's parameters.
    ///
    /// A signature mismatch is not an error: it yields `success = false`
    /// and `signature_valid = false`. Missing order reference is a
    /// `Validation` error.
    fn validate_callback(&self, params: &HashMap<String, String>) -> DomainResult<CallbackResult>;
}

/// Non-empty value of `key`, trimmed.
pub(crate) fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
