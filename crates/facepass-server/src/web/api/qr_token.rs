use crate::error::ServiceError;
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use axum::{extract::State, Json};
use facepass_common::models::user::PresentationToken;
use std::sync::Arc;

/// GET /api/v1/qr-token - the caller's presentation token, created on first use
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.0.user_id))]
pub async fn get_qr_token(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<PresentationToken>, ServiceError> {
    let token = state.token_store.get_or_create(auth.0.user_id).await?;
    Ok(Json(token))
}
