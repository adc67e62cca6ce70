//! HMAC helpers shared by the provider gateways

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use crate::shared::errors::DomainError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Lowercase hex HMAC-SHA256 of `data`
pub fn hmac_sha256_hex(secret: &str, data: &str) -> Result<String, DomainError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DomainError::Configuration(format!("invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Lowercase hex HMAC-SHA512 of `data`
pub fn hmac_sha512_hex(secret: &str, data: &str) -> Result<String, DomainError> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| DomainError::Configuration(format!("invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC-SHA256 signature (either case).
pub fn verify_sha256_hex(secret: &str, data: &str, provided: &str) -> bool {
    let Ok(provided) = hex::decode(provided.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Constant-time check of a hex HMAC-SHA512 signature (either case).
pub fn verify_sha512_hex(secret: &str, data: &str, provided: &str) -> bool {
    let Ok(provided) = hex::decode(provided.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_rfc4231_case_2() {
        assert_eq!(
            hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verification_is_case_insensitive_and_rejects_garbage() {
        let sig = hmac_sha512_hex("secret", "payload").unwrap();
        assert!(verify_sha512_hex("secret", "payload", &sig));
        assert!(verify_sha512_hex("secret", "payload", &sig.to_uppercase()));
        assert!(!verify_sha512_hex("secret", "payload!", &sig));
        assert!(!verify_sha512_hex("secret", "payload", "not-hex"));
        assert!(!verify_sha256_hex("secret", "payload", &sig));
    }
}
