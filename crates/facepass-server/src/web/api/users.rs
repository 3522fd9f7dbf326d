use crate::error::ServiceError;
use crate::state::AppState;
use crate::web::api::middleware::{AuthUser, ValidatedJson};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Missing fields deserialize as empty strings and are reported by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    /// Base64 (standard alphabet) enrollment photo
    pub photo: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// POST /api/v1/users/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let result = state.credentials.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        token: result.token,
        admin: result.admin,
    }))
}

/// POST /api/v1/users/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .credentials
        .register(&req.email, &req.username, &req.password, &req.photo)
        .await?;
    Ok(StatusCode::OK)
}

/// GET /api/v1/users - List users
#[tracing::instrument(skip(state, _auth))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);
    let users = state.credentials.list_users(limit, offset).await?;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_missing_fields_default_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"email": "a@x.com"}"#).unwrap();
        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.password, "");
    }

    #[test]
    fn test_register_request_reads_photo() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "a@x.com", "username": "alice", "password": "pw", "photo": "AAAA"}"#,
        )
        .unwrap();
        assert_eq!(req.photo, "AAAA");
    }

    #[test]
    fn test_list_query_defaults() {
        let q: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 50);
        assert_eq!(q.offset, 0);
    }
}
