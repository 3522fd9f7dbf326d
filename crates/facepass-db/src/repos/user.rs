use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use facepass_common::models::user::User;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "user_id, email, username, password_hash, photo_url, photo_key, is_admin, last_login_at, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub photo_url: String,
    pub photo_key: String,
    pub is_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            email: row.email,
            username: row.username,
            photo_url: row.photo_url,
            photo_key: row.photo_key,
            is_admin: row.is_admin,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        }
    }
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub photo_url: &'a str,
    pub photo_key: &'a str,
    pub is_admin: bool,
}

/// True if the error chain contains a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<sqlx::Error>())
        .filter_map(|e| e.as_database_error())
        .any(|db| db.is_unique_violation())
}

pub struct UserRepo;

impl UserRepo {
    /// Insert a user in its own transaction.
    pub async fn create(pool: &PgPool, user: &NewUser<'_>) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            r#"
            INSERT INTO app_user (user_id, email, username, password_hash, photo_url, photo_key, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.photo_url)
        .bind(user.photo_key)
        .bind(user.is_admin)
        .execute(&mut *tx)
        .await
        .context("Failed to create user")?;
        tx.commit().await.context("Failed to commit user")?;
        Ok(())
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM app_user WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM app_user WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM app_user WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await
                .context("Failed to check email uniqueness")?;
        Ok(exists)
    }

    pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            "UPDATE app_user SET last_login_at = NOW(), updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update last_login_at")?;
        tx.commit().await.context("Failed to commit last_login_at")?;
        Ok(())
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM app_user ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
        Ok(rows)
    }
}
