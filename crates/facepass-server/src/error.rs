use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facepass_common::validation::EMAIL_TAKEN;
use serde_json::json;
use thiserror::Error;

/// Failure classes surfaced by the credential and verification services.
///
/// Upstream and persistence variants carry the underlying error for logging;
/// none of it is ever written to the response.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("email address already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("presented token is invalid")]
    InvalidToken,
    #[error("token subject does not exist")]
    UnknownSubject,
    #[error("upstream service failed: {0:#}")]
    Upstream(#[source] anyhow::Error),
    #[error("persistence failed: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl ServiceError {
    /// Stable reason code for 5xx responses.
    ///
    /// `UnknownSubject` shares `invalid_token` so callers cannot probe which
    /// user ids exist.
    pub fn reason(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::DuplicateEmail => "validation",
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::InvalidToken | ServiceError::UnknownSubject => "invalid_token",
            ServiceError::Upstream(_) => "upstream_failure",
            ServiceError::Persistence(_) => "persistence_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::DuplicateEmail => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidToken
            | ServiceError::UnknownSubject
            | ServiceError::Upstream(_)
            | ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();
        match self {
            ServiceError::Validation(messages) => (status, Json(messages)).into_response(),
            ServiceError::DuplicateEmail => (status, Json(vec![EMAIL_TAKEN])).into_response(),
            ServiceError::InvalidCredentials => (
                status,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response(),
            ServiceError::InvalidToken | ServiceError::UnknownSubject => (
                status,
                Json(json!({
                    "error": "Could not identify a user from the QR token",
                    "reason": reason,
                })),
            )
                .into_response(),
            ServiceError::Upstream(e) => {
                tracing::error!("Upstream failure: {:#}", e);
                (
                    status,
                    Json(json!({
                        "error": "Upstream service failure",
                        "reason": reason,
                    })),
                )
                    .into_response()
            }
            ServiceError::Persistence(e) => {
                tracing::error!("Persistence failure: {:#}", e);
                (
                    status,
                    Json(json!({
                        "error": "Internal server error",
                        "reason": reason,
                    })),
                )
                    .into_response()
            }
        }
    }
}
