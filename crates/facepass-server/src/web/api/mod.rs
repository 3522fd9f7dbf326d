pub mod face_recognition;
pub mod middleware;
pub mod qr_token;
pub mod users;

use crate::state::AppState;
use axum::response::IntoResponse;
use axum::{routing::get, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;

/// GET /health -- unauthenticated liveness probe
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Password login and registration
        .route("/users/login", post(users::login))
        .route("/users/register", post(users::register))
        .route("/users", get(users::list_users))
        // Presentation token for the signed-in user
        .route("/qr-token", get(qr_token::get_qr_token))
        .route("/face-recognition", post(face_recognition::recognize))
        .with_state(state)
}
