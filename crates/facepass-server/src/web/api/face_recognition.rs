use crate::error::ServiceError;
use crate::state::AppState;
use crate::web::api::middleware::{AuthUser, ValidatedJson};
use axum::{extract::State, Json};
use facepass_common::models::verification::VerificationOutcome;
use facepass_common::validation::validate_face_recognition;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceRecognitionRequest {
    pub qr_token: String,
    /// Base64 (standard alphabet) probe photo
    pub photo: String,
}

/// POST /api/v1/face-recognition
#[tracing::instrument(skip(state, _auth, req))]
pub async fn recognize(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ValidatedJson(req): ValidatedJson<FaceRecognitionRequest>,
) -> Result<Json<VerificationOutcome>, ServiceError> {
    let probe =
        validate_face_recognition(&req.qr_token, &req.photo).map_err(ServiceError::Validation)?;
    let outcome = state.verifier.verify(req.qr_token.trim(), probe).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let req: FaceRecognitionRequest =
            serde_json::from_str(r#"{"qrToken": "a.b.c", "photo": "AAAA"}"#).unwrap();
        assert_eq!(req.qr_token, "a.b.c");
        assert_eq!(req.photo, "AAAA");
    }

    #[test]
    fn test_request_missing_fields_default_empty() {
        let req: FaceRecognitionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.qr_token.is_empty());
        assert!(req.photo.is_empty());
    }
}
