use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User model (safe for client responses -- no password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub photo_url: String,
    pub photo_key: String,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Presentation token joined with its owner, as returned by `GET /qr-token`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub qr_token: String,
    pub created_at: DateTime<Utc>,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            photo_url: "https://faces.s3.amazonaws.com/k1".to_string(),
            photo_key: "k1".to_string(),
            is_admin: false,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = sample_user();
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["email"], "a@x.com");
        assert_eq!(value["photoKey"], "k1");
        assert_eq!(value["isAdmin"], false);
        assert!(value.get("lastLoginAt").is_none());
        assert!(value.get("passwordHash").is_none());
    }

    #[test]
    fn test_presentation_token_embeds_user() {
        let user = sample_user();
        let token = PresentationToken {
            token_id: Uuid::new_v4(),
            user_id: user.user_id,
            qr_token: "header.payload.sig".to_string(),
            created_at: Utc::now(),
            user: user.clone(),
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["qrToken"], "header.payload.sig");
        assert_eq!(value["user"]["username"], "alice");
    }
}
