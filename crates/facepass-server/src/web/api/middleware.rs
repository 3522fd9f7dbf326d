use crate::error::ServiceError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use facepass_common::models::auth::Claims;
use facepass_common::validation::BODY_INVALID;
use serde_json::json;
use std::sync::Arc;

/// Extractor that validates a session Bearer token and provides its claims.
#[derive(Debug)]
pub struct AuthUser(pub Claims);

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": message}))).into_response()
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(val) => match val.strip_prefix("Bearer ") {
                Some(t) => t.trim(),
                None => return Err(unauthorized("Invalid authorization header format")),
            },
            None => return Err(unauthorized("Missing authorization header")),
        };

        match state.tokens.verify_session(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                tracing::debug!("Session token rejected: {}", e);
                Err(unauthorized("Invalid or expired token"))
            }
        }
    }
}

/// JSON body extractor whose rejections are validation errors.
///
/// Wrong content type, unparsable JSON and wrong-typed fields all answer
/// `400` with a message list, like any other field problem.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                tracing::debug!("Request body rejected: {}", rejection.body_text());
                Err(ServiceError::Validation(vec![BODY_INVALID.to_string()]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct EchoRequest {
        email: String,
    }

    async fn echo(ValidatedJson(req): ValidatedJson<EchoRequest>) -> String {
        req.email
    }

    async fn send(content_type: Option<&str>, body: &str) -> (StatusCode, Vec<u8>) {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("Content-Type", ct);
        }
        let response = Router::new()
            .route("/", post(echo))
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn assert_body_invalid(content_type: Option<&str>, body: &str) {
        let (status, bytes) = send(content_type, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        let messages: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(messages, json!([BODY_INVALID]));
    }

    #[tokio::test]
    async fn test_well_formed_body_passes_through() {
        let (status, bytes) = send(Some("application/json"), r#"{"email": "a@x.com"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"a@x.com");
    }

    #[tokio::test]
    async fn test_wrong_typed_field_is_validation_error() {
        assert_body_invalid(Some("application/json"), r#"{"email": 5}"#).await;
        assert_body_invalid(Some("application/json"), r#"{"email": null}"#).await;
    }

    #[tokio::test]
    async fn test_unparsable_json_is_validation_error() {
        assert_body_invalid(Some("application/json"), "{not json").await;
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation_error() {
        assert_body_invalid(None, r#"{"email": "a@x.com"}"#).await;
    }
}
