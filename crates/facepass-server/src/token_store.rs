use facepass_common::models::user::{PresentationToken, User};
use facepass_db::{PresentationTokenRepo, PresentationTokenRow, UserRepo, UserRow};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::error::ServiceError;

/// Per-user presentation tokens. At most one per user, minted on first request.
#[derive(Clone)]
pub struct TokenStore {
    pool: PgPool,
    tokens: TokenCodec,
}

fn to_model(token: PresentationTokenRow, user: UserRow) -> PresentationToken {
    PresentationToken {
        token_id: token.token_id,
        user_id: token.user_id,
        qr_token: token.token,
        created_at: token.created_at,
        user: User::from(user),
    }
}

impl TokenStore {
    pub fn new(pool: PgPool, tokens: TokenCodec) -> Self {
        Self { pool, tokens }
    }

    /// Return the user's presentation token, creating it if none exists.
    ///
    /// Concurrent first calls for one user all return the same token: the
    /// losers of the insert race read back the winner's row.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<PresentationToken, ServiceError> {
        if let Some((token, user)) = PresentationTokenRepo::get_with_user(&self.pool, user_id)
            .await
            .map_err(ServiceError::Persistence)?
        {
            return Ok(to_model(token, user));
        }

        if UserRepo::get_by_id(&self.pool, user_id)
            .await
            .map_err(ServiceError::Persistence)?
            .is_none()
        {
            tracing::warn!("Presentation token requested for unknown user {}", user_id);
            return Err(ServiceError::UnknownSubject);
        }

        let token = self
            .tokens
            .issue_presentation(user_id)
            .map_err(ServiceError::Persistence)?;
        let inserted =
            PresentationTokenRepo::insert_if_absent(&self.pool, Uuid::new_v4(), user_id, &token)
                .await
                .map_err(ServiceError::Persistence)?;
        if inserted {
            tracing::info!("Created presentation token for user {}", user_id);
        } else {
            tracing::debug!("Presentation token for user {} created concurrently", user_id);
        }

        let (token, user) = PresentationTokenRepo::get_with_user(&self.pool, user_id)
            .await
            .map_err(ServiceError::Persistence)?
            .ok_or_else(|| {
                ServiceError::Persistence(anyhow::anyhow!(
                    "Presentation token for user {} vanished after insert",
                    user_id
                ))
            })?;
        Ok(to_model(token, user))
    }
}
