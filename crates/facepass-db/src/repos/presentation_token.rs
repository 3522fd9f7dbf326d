use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::user::UserRow;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PresentationTokenRow {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PresentationTokenRepo;

impl PresentationTokenRepo {
    /// Insert a token unless the user already has one.
    ///
    /// Returns `true` if this call inserted the row. Concurrent callers for
    /// the same user race on the `user_id` unique constraint; exactly one
    /// of them wins and the rest see `false`.
    pub async fn insert_if_absent(
        pool: &PgPool,
        token_id: Uuid,
        user_id: Uuid,
        token: &str,
    ) -> Result<bool> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let result = sqlx::query(
            r#"
            INSERT INTO presentation_token (token_id, user_id, token)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(token)
        .execute(&mut *tx)
        .await
        .context("Failed to insert presentation token")?;
        tx.commit()
            .await
            .context("Failed to commit presentation token")?;
        Ok(result.rows_affected() == 1)
    }

    /// Read a user's token joined with the owning user row.
    pub async fn get_with_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<(PresentationTokenRow, UserRow)>> {
        let row = sqlx::query(
            r#"
            SELECT t.token_id, t.user_id, t.token, t.created_at, t.updated_at,
                   u.email, u.username, u.password_hash, u.photo_url, u.photo_key,
                   u.is_admin, u.last_login_at,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM presentation_token t
            JOIN app_user u ON u.user_id = t.user_id
            WHERE t.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get presentation token with user")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token = PresentationTokenRow {
            token_id: row.try_get("token_id")?,
            user_id: row.try_get("user_id")?,
            token: row.try_get("token")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };
        let user = UserRow {
            user_id: token.user_id,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            photo_url: row.try_get("photo_url")?,
            photo_key: row.try_get("photo_key")?,
            is_admin: row.try_get("is_admin")?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("user_created_at")?,
            updated_at: row.try_get("user_updated_at")?,
        };
        Ok(Some((token, user)))
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM presentation_token WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await
                .context("Failed to count presentation tokens")?;
        Ok(count)
    }
}
