use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use facepass_common::models::auth::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Fresh object key for an uploaded photo
pub fn generate_storage_key() -> String {
    Uuid::new_v4().to_string()
}

/// Why a token was refused
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature or encoding is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token claims are missing or malformed: {0}")]
    Claims(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::Claims(err),
            _ => TokenError::Invalid(err),
        }
    }
}

/// Signs and verifies session and presentation tokens (HS256).
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, session_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl_secs,
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(&auth.jwt_secret, auth.session_ttl_hours * 3600)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .context("Failed to sign token")
    }

    /// Mint a session token valid for the configured TTL
    pub fn issue_session(&self, user_id: Uuid) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        self.sign(&Claims::session(user_id, now, self.session_ttl_secs))
    }

    /// Validate a session token. `exp` is mandatory and enforced.
    pub fn verify_session(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Mint a presentation token. It carries no `exp` and never expires.
    pub fn issue_presentation(&self, user_id: Uuid) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        self.sign(&Claims::presentation(user_id, now))
    }

    /// Decode a presented token. `exp` is optional but still enforced when present.
    pub fn decode_presentation(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}
