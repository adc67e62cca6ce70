//! VNPay gateway
//!
//! Canonical form: every `vnp_` parameter with a non-empty value, keys in
//! ordinal order, key and value form-urlencoded, joined as `k=v` with `&`.
//! The signature is HMAC-SHA512 (lowercase hex) over that string and
//! travels as `vnp_SecureHash`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use url::form_urlencoded::byte_serialize;

use super::signing::{hmac_sha512_hex, verify_sha512_hex};
use super::{param, PaymentGateway, RedirectRequest};
use crate::config::VnPayConfig;
use crate::domain::payment::{CallbackResult, PaymentMethod};
use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
pub const SUCCESS_CODE: &str = "00";

const VN_OFFSET_SECS: i32 = 7 * 3600;

pub struct VnPayGateway {
    config: VnPayConfig,
}

impl VnPayGateway {
    pub fn new(config: VnPayConfig) -> Self {
        Self { config }
    }

    /// Sorted, encoded `k=v&...` over non-empty values.
    pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
        params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    byte_serialize(k.as_bytes()).collect::<String>(),
                    byte_serialize(v.as_bytes()).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Redirect URL for `request` created at `now`.
    pub fn redirect_url_at(
        &self,
        request: &RedirectRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<String> {
        self.config.validate()?;

        let offset = FixedOffset::east_opt(VN_OFFSET_SECS)
            .ok_or_else(|| DomainError::Configuration("invalid VNPay time zone".into()))?;
        let local = now.with_timezone(&offset);
        let expire = local + Duration::minutes(self.config.expire_minutes);
        // VNPay amounts are in hundredths of a dong
        let amount = (request.amount * 100.0).round() as i64;

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), self.config.version.clone());
        params.insert("vnp_Command".to_string(), "pay".to_string());
        params.insert("vnp_TmnCode".to_string(), self.config.tmn_code.clone());
        params.insert("vnp_Amount".to_string(), amount.to_string());
        params.insert(
            "vnp_CreateDate".to_string(),
            local.format("%Y%m%d%H%M%S").to_string(),
        );
        params.insert("vnp_CurrCode".to_string(), "VND".to_string());
        params.insert("vnp_IpAddr".to_string(), request.client_ip.clone());
        params.insert("vnp_Locale".to_string(), self.config.locale.clone());
        params.insert("vnp_OrderInfo".to_string(), request.order_info.clone());
        params.insert("vnp_OrderType".to_string(), "other".to_string());
        params.insert(
            "vnp_ReturnUrl".to_string(),
            request
                .return_url
                .clone()
                .unwrap_or_else(|| self.config.return_url.clone()),
        );
        params.insert("vnp_TxnRef".to_string(), request.order_ref.to_string());
        params.insert(
            "vnp_ExpireDate".to_string(),
            expire.format("%Y%m%d%H%M%S").to_string(),
        );

        let query = Self::canonical_query(&params);
        let signature = hmac_sha512_hex(&self.config.hash_secret, &query)?;
        Ok(format!(
            "{}?{}&{}={}",
            self.config.base_url, query, SECURE_HASH, signature
        ))
    }

    fn signed_fields(params: &HashMap<String, String>) -> BTreeMap<String, String> {
        params
            .iter()
            .filter(|(k, v)| {
                k.starts_with("vnp_")
                    && k.as_str() != SECURE_HASH
                    && k.as_str() != SECURE_HASH_TYPE
                    && !v.is_empty()
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl PaymentGateway for VnPayGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::VnPay
    }

    async fn build_redirect_url(&self, request: &RedirectRequest) -> DomainResult<String> {
        self.redirect_url_at(request, Utc::now())
    }

    fn validate_callback(&self, params: &HashMap<String, String>) -> DomainResult<CallbackResult> {
        self.config.validate()?;

        let order_ref = param(params, "vnp_TxnRef")
            .ok_or_else(|| DomainError::Validation("vnp_TxnRef is missing".into()))?;
        let provided = param(params, SECURE_HASH).unwrap_or_default();
        let canonical = Self::canonical_query(&Self::signed_fields(params));
        let signature_valid = verify_sha512_hex(&self.config.hash_secret, &canonical, provided);

        let response_code = param(params, "vnp_ResponseCode").map(str::to_string);
        let amount = param(params, "vnp_Amount")
            .and_then(|a| a.parse::<f64>().ok())
            .map(|a| a / 100.0);

        Ok(CallbackResult {
            provider: PaymentMethod::VnPay,
            success: signature_valid && response_code.as_deref() == Some(SUCCESS_CODE),
            signature_valid,
            order_ref: order_ref.to_string(),
            amount,
            transaction_no: param(params, "vnp_TransactionNo").map(str::to_string),
            response_code,
            bank_code: param(params, "vnp_BankCode").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::OrderRef;
    use chrono::TimeZone;
    use uuid::Uuid;

    const SECRET: &str = "VNPAYSECRET";

    fn gateway() -> VnPayGateway {
        VnPayGateway::new(VnPayConfig {
            tmn_code: "DEMO1234".into(),
            hash_secret: SECRET.into(),
            return_url: "https://evcs.test/api/v1/payments/vnpay/return".into(),
            ..Default::default()
        })
    }

    fn callback() -> HashMap<String, String> {
        [
            ("vnp_Amount", "3500000"),
            ("vnp_BankCode", "NCB"),
            ("vnp_OrderInfo", "Thanh toan phien sac"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TmnCode", "DEMO1234"),
            ("vnp_TransactionNo", "14000001"),
            ("vnp_TxnRef", "P0123456789abcdef0123456789abcdef"),
            ("vnp_CardType", ""),
            ("vnp_SecureHashType", "HmacSHA512"),
            (
                "vnp_SecureHash",
                "835e1d8411b954446bd0f536c1f8aa8c3ed4e0d4ebe6a96199448727c8e5b1d42cccb431eacd58367f98bb5edd634fa03cb2fd896cfb4b651526002b9b49ad54",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn canonical_query_sorts_encodes_and_skips_empty() {
        let params: BTreeMap<String, String> = [
            ("vnp_TxnRef", "P1"),
            ("vnp_Amount", "100"),
            ("vnp_OrderInfo", "a b&c"),
            ("vnp_BankCode", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(
            VnPayGateway::canonical_query(&params),
            "vnp_Amount=100&vnp_OrderInfo=a+b%26c&vnp_TxnRef=P1"
        );
    }

    #[test]
    fn known_callback_verifies() {
        let result = gateway().validate_callback(&callback()).unwrap();
        assert!(result.signature_valid);
        assert!(result.success);
        assert_eq!(result.amount, Some(35_000.0));
        assert_eq!(result.transaction_no.as_deref(), Some("14000001"));
    }

    #[test]
    fn tampered_amount_fails_even_with_success_code() {
        let mut params = callback();
        params.insert("vnp_Amount".into(), "100".into());
        let result = gateway().validate_callback(&params).unwrap();
        assert!(!result.signature_valid);
        assert!(!result.success);
    }

    #[test]
    fn provider_failure_code_is_not_success() {
        let gw = gateway();
        let mut params = callback();
        params.insert("vnp_ResponseCode".into(), "24".into());
        params.remove(SECURE_HASH);
        let canonical = VnPayGateway::canonical_query(&VnPayGateway::signed_fields(&params));
        params.insert(SECURE_HASH.into(), hmac_sha512_hex(SECRET, &canonical).unwrap());

        let result = gw.validate_callback(&params).unwrap();
        assert!(result.signature_valid);
        assert!(!result.success);
    }

    #[test]
    fn redirect_url_is_signed_over_its_own_query() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 3, 0, 0).unwrap();
        let request = RedirectRequest {
            order_ref: OrderRef::Payment(Uuid::nil()),
            amount: 35_000.0,
            order_info: "Charging session".into(),
            client_ip: "127.0.0.1".into(),
            return_url: None,
        };
        let url = gateway().redirect_url_at(&request, now).unwrap();
        let (_, query) = url.split_once('?').unwrap();
        let (signed, hash) = query.rsplit_once("&vnp_SecureHash=").unwrap();

        assert!(signed.contains("vnp_Amount=3500000"));
        assert!(signed.contains("vnp_CreateDate=20250501100000"));
        assert!(signed.contains("vnp_ExpireDate=20250501101500"));
        assert!(signed.contains("vnp_TxnRef=P00000000000000000000000000000000"));
        assert!(verify_sha512_hex(SECRET, signed, hash));
    }

    #[test]
    fn unconfigured_gateway_fails_fast() {
        let gw = VnPayGateway::new(VnPayConfig::default());
        let err = gw.validate_callback(&callback()).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn missing_order_ref_is_rejected() {
        let mut params = callback();
        params.remove("vnp_TxnRef");
        assert!(matches!(
            gateway().validate_callback(&params),
            Err(DomainError::Validation(_))
        ));
    }
}
