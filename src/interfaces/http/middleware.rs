//! Bearer-token authentication for the API routes

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, Role, TokenClaims};

use super::common::{ApiError, ApiResponse};

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Caller identity placed in request extensions by `auth_middleware`.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden("staff role required"))
        }
    }

    /// Owners see their own records; staff see everything.
    pub fn ensure_can_access(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.user_id == owner_id || self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden("resource belongs to another user"))
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| auth_error_response(AuthError::MissingToken))
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return auth_error_response(AuthError::MissingToken);
    };
    let Some(token) = extract_token(auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) if claims.is_expired() => auth_error_response(AuthError::ExpiredToken),
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(AuthenticatedUser::from_claims(claims));
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            auth_error_response(AuthError::InvalidToken)
        }
    }
}

fn auth_error_response(error: AuthError) -> Response {
    let message = match error {
        AuthError::MissingToken => "Missing authentication token",
        AuthError::InvalidToken => "Invalid authentication token",
        AuthError::ExpiredToken => "Token has expired",
    };
    let body = ApiResponse::<()>::error_with_code(message, "UNAUTHORIZED");
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::crypto::jwt::create_token;
    use axum::routing::get;
    use axum::Router;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "middleware-test".into(),
            expiration_hours: 1,
            issuer: "evcs".into(),
        }
    }

    async fn whoami(user: AuthenticatedUser) -> String {
        format!("{}:{}", user.user_id, user.role.as_str())
    }

    async fn call(auth: Option<String>) -> (StatusCode, String) {
        use tower::Service;
        let state = AuthState { jwt_config: jwt() };
        let mut svc = Router::new()
            .route("/me", get(whoami))
            .layer(axum::middleware::from_fn_with_state(state, auth_middleware))
            .into_service();
        let mut req = Request::builder().uri("/me");
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let resp = svc.call(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn valid_token_exposes_user() {
        let user = Uuid::new_v4();
        let token = create_token(user, Role::Staff, &jwt()).unwrap();
        let (status, body) = call(Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{}:staff", user));
    }

    #[tokio::test]
    async fn missing_or_garbage_token_is_401() {
        assert_eq!(call(None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(call(Some("Bearer nope".into())).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(call(Some("Basic abc".into())).await.0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn only_staff_and_admin_pass_staff_check() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        assert!(user.require_staff().is_err());
        let admin = AuthenticatedUser {
            role: Role::Admin,
            ..user
        };
        assert!(admin.require_staff().is_ok());
    }
}
