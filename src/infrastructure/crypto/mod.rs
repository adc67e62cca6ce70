//! Token signing for the HTTP API

pub mod jwt;

pub use jwt::{create_token, verify_token, JwtConfig, Role, TokenClaims};
