//! Configuration module
//!
//! `AppConfig` is read from a TOML file (`EVCS_CONFIG` or
//! `~/.config/evcs/config.toml`). Every section has defaults, so a missing
//! file or a partial file is fine. Secrets can be supplied through the
//! environment instead of the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

/// Default config location: `~/.config/evcs/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evcs")
        .join("config.toml")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub billing: BillingConfig,
    pub payments: PaymentsConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file yields defaults; environment
    /// overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("EVCS_JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        if let Ok(secret) = std::env::var("EVCS_VNPAY_HASH_SECRET") {
            self.payments.vnpay.hash_secret = secret;
        }
        if let Ok(secret) = std::env::var("EVCS_MOMO_SECRET_KEY") {
            self.payments.momo.secret_key = secret;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SeaORM connection URL (`sqlite://...` or `postgres://...`)
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://./evcs.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `"pretty"` or `"json"`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiration_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_issuer: "evcs".to_string(),
            jwt_expiration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Minimum charge for a completed session
    pub base_fee: f64,
    /// Booking sessions need a Succeeded payment before they start
    pub prepay_required: bool,
    pub default_reservation_hours: i64,
    pub confirmation_prefix: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_fee: 10_000.0,
            prepay_required: false,
            default_reservation_hours: 2,
            confirmation_prefix: "EVR-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub vnpay: VnPayConfig,
    pub momo: MomoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VnPayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub base_url: String,
    pub return_url: String,
    pub version: String,
    pub locale: String,
    pub expire_minutes: i64,
}

impl Default for VnPayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            hash_secret: String::new(),
            base_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
            return_url: String::new(),
            version: "2.1.0".to_string(),
            locale: "vn".to_string(),
            expire_minutes: 15,
        }
    }
}

impl VnPayConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        require("payments.vnpay.tmn_code", &self.tmn_code)?;
        require("payments.vnpay.hash_secret", &self.hash_secret)?;
        require("payments.vnpay.base_url", &self.base_url)?;
        require("payments.vnpay.return_url", &self.return_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub redirect_url: String,
    pub ipn_url: String,
    pub request_type: String,
}

impl Default for MomoConfig {
    fn default() -> Self {
        Self {
            partner_code: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            endpoint: "https://test-payment.momo.vn/v2/gateway/api/create".to_string(),
            redirect_url: String::new(),
            ipn_url: String::new(),
            request_type: "captureWallet".to_string(),
        }
    }
}

impl MomoConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        require("payments.momo.partner_code", &self.partner_code)?;
        require("payments.momo.access_key", &self.access_key)?;
        require("payments.momo.secret_key", &self.secret_key)?;
        require("payments.momo.endpoint", &self.endpoint)?;
        require("payments.momo.redirect_url", &self.redirect_url)?;
        require("payments.momo.ipn_url", &self.ipn_url)
    }
}

fn require(key: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::Configuration(format!("{} is not set", key)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [server]
            api_port = 9090

            [billing]
            prepay_required = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.api_port, 9090);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert!(cfg.billing.prepay_required);
        assert_eq!(cfg.billing.base_fee, 10_000.0);
        assert_eq!(cfg.billing.confirmation_prefix, "EVR-");
    }

    #[test]
    fn missing_provider_secret_is_a_configuration_error() {
        let mut vnpay = VnPayConfig {
            tmn_code: "DEMO".into(),
            return_url: "https://example.test/return".into(),
            ..Default::default()
        };
        let err = vnpay.validate().unwrap_err();
        assert!(matches!(err, DomainError::Configuration(ref m) if m.contains("hash_secret")));

        vnpay.hash_secret = "secret".into();
        assert!(vnpay.validate().is_ok());
        assert!(MomoConfig::default().validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/evcs/config.toml")).unwrap();
        assert_eq!(cfg.server.shutdown_timeout, 30);
    }
}
