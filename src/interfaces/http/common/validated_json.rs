//! `Json<T>` plus `validator::Validate`.
//!
//! Malformed JSON is a 400; a body that parses but fails validation is a
//! 422 listing every failing field.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Invalid(validator::ValidationErrors),
}

fn describe(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    fields.sort();
    if fields.is_empty() {
        "Validation failed".to_string()
    } else {
        fields.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Json(rejection) => {
                let body = ApiResponse::<()>::error_with_code(
                    format!("Invalid JSON: {}", rejection.body_text()),
                    "BAD_REQUEST",
                );
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::Invalid(errors) => {
                let body = ApiResponse::<()>::error_with_code(describe(&errors), "VALIDATION_ERROR");
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;
        value.validate().map_err(ValidatedJsonRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct EndSessionBody {
        #[validate(range(min = 0.0, max = 1000.0))]
        energy_kwh: f64,
        #[validate(length(max = 20))]
        note: Option<String>,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<EndSessionBody>) -> String {
        body.energy_kwh.to_string()
    }

    async fn send(body: &'static str) -> (StatusCode, serde_json::Value) {
        use tower::Service;
        let mut svc = Router::new().route("/end", post(handler)).into_service();
        let req = Request::builder()
            .method("POST")
            .uri("/end")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = svc.call(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn valid_body_reaches_handler() {
        let (status, _) = send(r#"{"energy_kwh": 12.5}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let (status, body) = send("energy=12").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn failing_fields_are_listed_with_422() {
        let (status, body) =
            send(r#"{"energy_kwh": -1.0, "note": "this note is far too long to keep"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("energy_kwh"));
        assert!(message.contains("note"));
    }
}
