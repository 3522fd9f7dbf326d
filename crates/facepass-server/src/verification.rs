use facepass_common::models::verification::VerificationOutcome;
use facepass_db::{NewVerificationRecord, UserRepo, VerificationRecordRepo};
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;

use crate::auth::{generate_storage_key, TokenCodec, TokenError};
use crate::blob_store::BlobStore;
use crate::error::ServiceError;
use crate::face_matcher::FaceMatcher;

/// Steps of a single verification, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TokenReceived,
    TokenDecoded,
    UserResolved,
    ProbeUploaded,
    Compared,
    ResultPersisted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::TokenReceived => "token_received",
            Stage::TokenDecoded => "token_decoded",
            Stage::UserResolved => "user_resolved",
            Stage::ProbeUploaded => "probe_uploaded",
            Stage::Compared => "compared",
            Stage::ResultPersisted => "result_persisted",
            Stage::Responded => "responded",
        };
        f.write_str(s)
    }
}

/// Checks a probe photo against the enrollment photo of the user named by a
/// presentation token.
#[derive(Clone)]
pub struct FaceVerifier {
    pool: PgPool,
    tokens: TokenCodec,
    blob_store: Arc<dyn BlobStore>,
    face_matcher: Arc<dyn FaceMatcher>,
    threshold: f64,
}

impl FaceVerifier {
    pub fn new(
        pool: PgPool,
        tokens: TokenCodec,
        blob_store: Arc<dyn BlobStore>,
        face_matcher: Arc<dyn FaceMatcher>,
        threshold: f64,
    ) -> Self {
        Self {
            pool,
            tokens,
            blob_store,
            face_matcher,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run one verification. Stops at the first failing step; a record is
    /// written only after a comparison completed.
    #[tracing::instrument(skip_all)]
    pub async fn verify(
        &self,
        qr_token: &str,
        probe: Vec<u8>,
    ) -> Result<VerificationOutcome, ServiceError> {
        let result = self.run(qr_token, probe).await;
        match result {
            Ok(outcome) => tracing::info!(
                "Verification finished: authResult={}, similarity={:.3}",
                outcome.auth_result,
                outcome.similarity
            ),
            Err(ref e) => tracing::warn!("Verification rejected: {}", e.reason()),
        }
        result
    }

    async fn run(
        &self,
        qr_token: &str,
        probe: Vec<u8>,
    ) -> Result<VerificationOutcome, ServiceError> {
        tracing::debug!(stage = %Stage::TokenReceived);
        let claims = self.tokens.decode_presentation(qr_token).map_err(|e| {
            match e {
                TokenError::Invalid(_) => tracing::debug!("Token signature or encoding rejected"),
                TokenError::Claims(_) => tracing::debug!("Token claims rejected"),
            }
            ServiceError::InvalidToken
        })?;
        tracing::debug!(stage = %Stage::TokenDecoded, user_id = %claims.user_id);

        let user = UserRepo::get_by_id(&self.pool, claims.user_id)
            .await
            .map_err(ServiceError::Persistence)?
            .ok_or(ServiceError::UnknownSubject)?;
        if user.photo_key.is_empty() {
            tracing::warn!("User {} has no enrollment photo", user.user_id);
            return Err(ServiceError::UnknownSubject);
        }
        tracing::debug!(stage = %Stage::UserResolved, user_id = %user.user_id);

        let probe_blob = self
            .blob_store
            .put(probe, &generate_storage_key())
            .await
            .map_err(ServiceError::Upstream)?;
        tracing::debug!(stage = %Stage::ProbeUploaded, key = %probe_blob.key);

        let score = self
            .face_matcher
            .compare(&user.photo_key, &probe_blob.key)
            .await
            .map_err(ServiceError::Upstream)?
            .score();
        tracing::debug!(stage = %Stage::Compared, similarity = score);

        let record = NewVerificationRecord {
            user_id: user.user_id,
            reference_url: &user.photo_url,
            reference_key: &user.photo_key,
            probe_url: &probe_blob.url,
            probe_key: &probe_blob.key,
            similarity: score,
        };
        let record_id = VerificationRecordRepo::create(&self.pool, &record)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Comparison for user {} scored {:.3} but was not recorded",
                    user.user_id,
                    score
                );
                ServiceError::Persistence(e)
            })?;
        tracing::debug!(stage = %Stage::ResultPersisted, record_id = %record_id);

        let outcome = VerificationOutcome::decide(score, self.threshold);
        tracing::debug!(stage = %Stage::Responded);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::StoredBlob;
    use crate::face_matcher::MatchOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        puts: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for CountingStore {
        async fn put(&self, _bytes: Vec<u8>, key: &str) -> anyhow::Result<StoredBlob> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(StoredBlob {
                key: key.to_string(),
                url: format!("mem://{}", key),
            })
        }
    }

    #[derive(Default)]
    struct CountingMatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FaceMatcher for CountingMatcher {
        async fn compare(&self, _reference: &str, _probe: &str) -> anyhow::Result<MatchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MatchOutcome::Similarity(99.0))
        }
    }

    fn verifier(store: Arc<CountingStore>, matcher: Arc<CountingMatcher>) -> FaceVerifier {
        // Never connected: every case below must be rejected before the database.
        let pool = PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        FaceVerifier::new(pool, TokenCodec::new("secret", 3600), store, matcher, 90.0)
    }

    async fn assert_rejected_early(token: &str) {
        let store = Arc::new(CountingStore::default());
        let matcher = Arc::new(CountingMatcher::default());
        let v = verifier(store.clone(), matcher.clone());

        let err = v.verify(token, vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken), "got {:?}", err);
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_before_side_effects() {
        assert_rejected_early("not-a-token").await;
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected_before_side_effects() {
        let token = TokenCodec::new("other-secret", 3600)
            .issue_presentation(uuid::Uuid::new_v4())
            .unwrap();
        assert_rejected_early(&token).await;
    }

    #[tokio::test]
    async fn test_token_without_user_id_rejected_before_side_effects() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({"iat": 1_700_000_000}),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_rejected_early(&token).await;
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::TokenReceived.to_string(), "token_received");
        assert_eq!(Stage::ResultPersisted.to_string(), "result_persisted");
    }
}
