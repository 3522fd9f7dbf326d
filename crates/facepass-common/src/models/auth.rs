use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by both session and presentation tokens.
///
/// Session tokens always carry `exp`. Presentation tokens never do, so they
/// stay valid for as long as the signing secret does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// Claims for a session token issued at `now` and valid for `ttl_secs`.
    pub fn session(user_id: Uuid, now: i64, ttl_secs: i64) -> Self {
        Self {
            user_id,
            iat: now,
            exp: Some(now + ttl_secs),
        }
    }

    /// Claims for a presentation token (no expiry).
    pub fn presentation(user_id: Uuid, now: i64) -> Self {
        Self {
            user_id,
            iat: now,
            exp: None,
        }
    }
}
