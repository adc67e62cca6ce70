//! MoMo gateway
//!
//! MoMo signs a fixed, provider-mandated field order (not alphabetical)
//! with HMAC-SHA256. Creating an order is a JSON POST that returns the
//! `payUrl` to redirect to.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::signing::{hmac_sha256_hex, verify_sha256_hex};
use super::{param, PaymentGateway, RedirectRequest};
use crate::config::MomoConfig;
use crate::domain::payment::{CallbackResult, PaymentMethod};
use crate::domain::DomainResult;
use crate::shared::errors::{DomainError, InfraError};

pub const SIGNATURE: &str = "signature";
pub const SUCCESS_CODE: &str = "0";

/// Callback signature field order. `accessKey` comes from config.
pub const CALLBACK_FIELDS: [&str; 13] = [
    "accessKey",
    "amount",
    "extraData",
    "message",
    "orderId",
    "orderInfo",
    "orderType",
    "partnerCode",
    "payType",
    "requestId",
    "responseTime",
    "resultCode",
    "transId",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    partner_code: &'a str,
    request_id: String,
    amount: i64,
    order_id: String,
    order_info: &'a str,
    redirect_url: &'a str,
    ipn_url: &'a str,
    request_type: &'a str,
    extra_data: &'a str,
    lang: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    result_code: i64,
    #[serde(default)]
    message: String,
    pay_url: Option<String>,
}

pub struct MomoGateway {
    config: MomoConfig,
    http: reqwest::Client,
}

impl MomoGateway {
    pub fn new(config: MomoConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Raw string signed when creating an order.
    pub fn create_signature_payload(
        &self,
        amount: i64,
        order_id: &str,
        order_info: &str,
        redirect_url: &str,
        request_id: &str,
    ) -> String {
        format!(
            "accessKey={}&amount={}&extraData=&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
            self.config.access_key,
            amount,
            self.config.ipn_url,
            order_id,
            order_info,
            self.config.partner_code,
            redirect_url,
            request_id,
            self.config.request_type,
        )
    }

    /// Raw string signed for a callback, in `CALLBACK_FIELDS` order.
    pub fn callback_signature_payload(&self, params: &HashMap<String, String>) -> String {
        CALLBACK_FIELDS
            .iter()
            .map(|field| {
                let value = if *field == "accessKey" {
                    self.config.access_key.as_str()
                } else {
                    params.get(*field).map(String::as_str).unwrap_or("")
                };
                format!("{}={}", field, value)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[async_trait]
impl PaymentGateway for MomoGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::MoMo
    }

    async fn build_redirect_url(&self, request: &RedirectRequest) -> DomainResult<String> {
        self.config.validate()?;

        let amount = request.amount.round() as i64;
        let order_id = request.order_ref.to_string();
        let request_id = Uuid::new_v4().simple().to_string();
        let redirect_url = request
            .return_url
            .as_deref()
            .unwrap_or(&self.config.redirect_url);
        let raw = self.create_signature_payload(
            amount,
            &order_id,
            &request.order_info,
            redirect_url,
            &request_id,
        );
        let body = CreatePaymentRequest {
            partner_code: &self.config.partner_code,
            request_id,
            amount,
            order_id,
            order_info: &request.order_info,
            redirect_url,
            ipn_url: &self.config.ipn_url,
            request_type: &self.config.request_type,
            extra_data: "",
            lang: "vi",
            signature: hmac_sha256_hex(&self.config.secret_key, &raw)?,
        };

        debug!(order_id = %body.order_id, amount, "Creating MoMo payment");
        let response: CreatePaymentResponse = self
            .http
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(InfraError::from)?
            .json()
            .await
            .map_err(InfraError::from)?;

        match response.pay_url {
            Some(url) if response.result_code == 0 => Ok(url),
            _ => {
                warn!(
                    result_code = response.result_code,
                    message = %response.message,
                    "MoMo rejected payment creation"
                );
                Err(DomainError::Validation(format!(
                    "MoMo rejected payment: {} ({})",
                    response.message, response.result_code
                )))
            }
        }
    }

    fn validate_callback(&self, params: &HashMap<String, String>) -> DomainResult<CallbackResult> {
        self.config.validate()?;

        let order_ref = param(params, "orderId")
            .ok_or_else(|| DomainError::Validation("orderId is missing".into()))?;
        let provided = param(params, SIGNATURE).unwrap_or_default();
        let raw = self.callback_signature_payload(params);
        let signature_valid = verify_sha256_hex(&self.config.secret_key, &raw, provided);
        let result_code = param(params, "resultCode").map(str::to_string);

        Ok(CallbackResult {
            provider: PaymentMethod::MoMo,
            success: signature_valid && result_code.as_deref() == Some(SUCCESS_CODE),
            signature_valid,
            order_ref: order_ref.to_string(),
            amount: param(params, "amount").and_then(|a| a.parse::<f64>().ok()),
            transaction_no: param(params, "transId").map(str::to_string),
            response_code: result_code,
            bank_code: param(params, "payType").map(str::to_string),
        })
    }
}

/// Flatten a MoMo IPN JSON body into string parameters.
pub fn json_to_params(body: &serde_json::Value) -> HashMap<String, String> {
    body.as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "K951B6PE1waDMi640xX08PD3vg6EkVlz";
    const KNOWN_SIGNATURE: &str =
        "3d335c997ea070ea3d1a435a7a52f679f83af9abf3310a09f53550145dda6bca";

    fn gateway() -> MomoGateway {
        MomoGateway::new(MomoConfig {
            partner_code: "MOMO".into(),
            access_key: "F8BBA842ECF85".into(),
            secret_key: SECRET.into(),
            redirect_url: "https://evcs.test/api/v1/payments/momo/return".into(),
            ipn_url: "https://evcs.test/api/v1/payments/momo/ipn".into(),
            ..Default::default()
        })
    }

    fn ipn_body() -> serde_json::Value {
        serde_json::json!({
            "partnerCode": "MOMO",
            "orderId": "B0123456789abcdef0123456789abcdef",
            "requestId": "req-1",
            "amount": 50000,
            "orderInfo": "Booking payment",
            "orderType": "momo_wallet",
            "transId": 4088878653u64,
            "resultCode": 0,
            "message": "Successful.",
            "payType": "qr",
            "responseTime": 1700000000000u64,
            "extraData": "",
            "signature": KNOWN_SIGNATURE
        })
    }

    #[test]
    fn known_ipn_verifies() {
        let params = json_to_params(&ipn_body());
        let result = gateway().validate_callback(&params).unwrap();
        assert!(result.signature_valid);
        assert!(result.success);
        assert_eq!(result.amount, Some(50_000.0));
        assert_eq!(result.transaction_no.as_deref(), Some("4088878653"));
    }

    #[test]
    fn field_order_is_fixed_not_alphabetical() {
        let params = json_to_params(&ipn_body());
        let raw = gateway().callback_signature_payload(&params);
        assert!(raw.starts_with("accessKey=F8BBA842ECF85&amount=50000&extraData=&message="));
        assert!(raw.ends_with("&resultCode=0&transId=4088878653"));
    }

    #[test]
    fn tampered_result_code_is_rejected() {
        let mut body = ipn_body();
        body["amount"] = serde_json::json!(1);
        let result = gateway().validate_callback(&json_to_params(&body)).unwrap();
        assert!(!result.signature_valid);
        assert!(!result.success);
    }

    #[test]
    fn failure_result_code_is_not_success() {
        let gw = gateway();
        let mut params = json_to_params(&ipn_body());
        params.insert("resultCode".into(), "1006".into());
        let raw = gw.callback_signature_payload(&params);
        params.insert(SIGNATURE.into(), hmac_sha256_hex(SECRET, &raw).unwrap());

        let result = gw.validate_callback(&params).unwrap();
        assert!(result.signature_valid);
        assert!(!result.success);
        assert_eq!(result.response_code.as_deref(), Some("1006"));
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_before_any_request() {
        let gw = MomoGateway::new(MomoConfig::default());
        let request = RedirectRequest {
            order_ref: crate::domain::payment::OrderRef::Payment(Uuid::new_v4()),
            amount: 10_000.0,
            order_info: "x".into(),
            client_ip: "127.0.0.1".into(),
            return_url: None,
        };
        assert!(matches!(
            gw.build_redirect_url(&request).await,
            Err(DomainError::Configuration(_))
        ));
    }
}
