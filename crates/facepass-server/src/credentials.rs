use anyhow::Context;
use facepass_common::models::user::User;
use facepass_common::validation::{validate_login, validate_registration};
use facepass_db::{is_unique_violation, NewUser, UserRepo};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::auth::{generate_storage_key, hash_password, verify_password, TokenCodec};
use crate::blob_store::BlobStore;
use crate::error::ServiceError;

/// Successful password login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: Uuid,
    pub token: String,
    pub admin: bool,
}

/// Password login, registration and the user directory listing
#[derive(Clone)]
pub struct CredentialService {
    pool: PgPool,
    tokens: TokenCodec,
    blob_store: Arc<dyn BlobStore>,
}

async fn hash_blocking(password: &str) -> anyhow::Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")?
}

/// Hash checked for unknown emails so both login failures cost one argon2 run.
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

async fn dummy_hash() -> anyhow::Result<&'static str> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_blocking("facepass-login-placeholder"))
        .await?;
    Ok(hash.as_str())
}

async fn verify_blocking(password: &str, hash: &str) -> anyhow::Result<bool> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("Password verification task failed")?
}

impl CredentialService {
    pub fn new(pool: PgPool, tokens: TokenCodec, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            pool,
            tokens,
            blob_store,
        }
    }

    /// Check a password and mint a session token.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ServiceError> {
        validate_login(email, password).map_err(ServiceError::Validation)?;

        let user = match UserRepo::get_by_email(&self.pool, email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                match dummy_hash().await {
                    Ok(hash) => {
                        let _ = verify_blocking(password, hash).await;
                    }
                    Err(e) => tracing::error!("Failed to prepare dummy password hash: {:#}", e),
                }
                tracing::info!("Login rejected: unknown email");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(ServiceError::Persistence(e)),
        };

        match verify_blocking(password, &user.password_hash).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Login rejected: wrong password for user {}", user.user_id);
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => {
                // Unusable stored hash; treat like a wrong password towards the caller.
                tracing::error!("Password verification error for user {}: {:#}", user.user_id, e);
                return Err(ServiceError::InvalidCredentials);
            }
        }

        let token = self
            .tokens
            .issue_session(user.user_id)
            .map_err(ServiceError::Persistence)?;

        if let Err(e) = UserRepo::touch_last_login(&self.pool, user.user_id).await {
            tracing::warn!("Failed to record last login for {}: {:#}", user.user_id, e);
        }

        tracing::info!("User {} logged in", user.user_id);
        Ok(LoginResult {
            user_id: user.user_id,
            token,
            admin: user.is_admin,
        })
    }

    /// Create a user with an enrollment photo.
    ///
    /// The photo is uploaded before the row is written; the row is only
    /// inserted once the upload succeeded, so a failure at either step
    /// leaves no user behind.
    #[tracing::instrument(skip(self, password, photo_base64))]
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        photo_base64: &str,
    ) -> Result<Uuid, ServiceError> {
        let photo = validate_registration(email, username, password, photo_base64)
            .map_err(ServiceError::Validation)?;

        if UserRepo::email_exists(&self.pool, email)
            .await
            .map_err(ServiceError::Persistence)?
        {
            tracing::info!("Registration rejected: duplicate email");
            return Err(ServiceError::DuplicateEmail);
        }

        let key = generate_storage_key();
        let blob = self
            .blob_store
            .put(photo, &key)
            .await
            .map_err(ServiceError::Upstream)?;
        tracing::info!("Stored enrollment photo {}", blob.key);

        let password_hash = hash_blocking(password)
            .await
            .map_err(ServiceError::Persistence)?;

        let user_id = Uuid::new_v4();
        let new_user = NewUser {
            user_id,
            email,
            username: username.trim(),
            password_hash: &password_hash,
            photo_url: &blob.url,
            photo_key: &blob.key,
            is_admin: false,
        };
        if let Err(e) = UserRepo::create(&self.pool, &new_user).await {
            if is_unique_violation(&e) {
                tracing::info!("Registration rejected: email registered concurrently");
                return Err(ServiceError::DuplicateEmail);
            }
            return Err(ServiceError::Persistence(e));
        }

        tracing::info!("Registered user {}", user_id);
        Ok(user_id)
    }

    /// Seed an administrator without an enrollment photo, unless the email exists.
    ///
    /// Returns `true` if the user was created.
    pub async fn ensure_admin(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<bool> {
        if UserRepo::email_exists(&self.pool, email).await? {
            return Ok(false);
        }
        let password_hash = hash_blocking(password).await?;
        UserRepo::create(
            &self.pool,
            &NewUser {
                user_id: Uuid::new_v4(),
                email,
                username,
                password_hash: &password_hash,
                photo_url: "",
                photo_key: "",
                is_admin: true,
            },
        )
        .await
        .context("Failed to create initial admin")?;
        Ok(true)
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, ServiceError> {
        let rows = UserRepo::list(&self.pool, limit, offset)
            .await
            .map_err(ServiceError::Persistence)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
