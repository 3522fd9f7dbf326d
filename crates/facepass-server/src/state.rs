use crate::auth::TokenCodec;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::credentials::CredentialService;
use crate::face_matcher::FaceMatcher;
use crate::token_store::TokenStore;
use crate::verification::FaceVerifier;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub tokens: TokenCodec,
    pub credentials: CredentialService,
    pub token_store: TokenStore,
    pub verifier: FaceVerifier,
}

impl AppState {
    /// Wire the services together from one config and one set of backends
    pub fn new(
        pool: PgPool,
        config: ServerConfig,
        blob_store: Arc<dyn BlobStore>,
        face_matcher: Arc<dyn FaceMatcher>,
    ) -> Self {
        let tokens = TokenCodec::from_config(&config.auth);
        let credentials = CredentialService::new(pool.clone(), tokens.clone(), blob_store.clone());
        let token_store = TokenStore::new(pool.clone(), tokens.clone());
        let verifier = FaceVerifier::new(
            pool.clone(),
            tokens.clone(),
            blob_store,
            face_matcher,
            config.verification.similarity_threshold,
        );
        Self {
            pool,
            config: Arc::new(config),
            tokens,
            credentials,
            token_store,
            verifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::LocalBlobStore;
    use crate::config::{
        AuthConfig, BlobStoreConfig, DbConfig, FaceMatcherConfig, LocalBlobConfig,
        VerificationConfig,
    };
    use crate::face_matcher::MatchOutcome;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedMatcher;

    #[async_trait]
    impl FaceMatcher for FixedMatcher {
        async fn compare(&self, _r: &str, _p: &str) -> anyhow::Result<MatchOutcome> {
            Ok(MatchOutcome::Similarity(50.0))
        }
    }

    fn test_state(photo_dir: &std::path::Path, threshold: f64) -> AppState {
        let config = ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            db: DbConfig {
                url: "postgres://invalid:5432/db".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "state-secret".to_string(),
                session_ttl_hours: 2,
            },
            blob_store: BlobStoreConfig::Local(LocalBlobConfig {
                dir: photo_dir.to_string_lossy().to_string(),
                base_url: None,
            }),
            face_matcher: FaceMatcherConfig::Rekognition {
                region: "us-east-1".to_string(),
                endpoint: None,
                min_similarity: 0.0,
            },
            verification: VerificationConfig {
                similarity_threshold: threshold,
            },
            initial_admin: None,
        };
        let pool = PgPool::connect_lazy("postgres://invalid:5432/db").unwrap();
        AppState::new(
            pool,
            config,
            Arc::new(LocalBlobStore::new(photo_dir, None)),
            Arc::new(FixedMatcher),
        )
    }

    #[tokio::test]
    async fn test_services_share_signing_key() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 90.0);

        let user_id = uuid::Uuid::new_v4();
        let session = state.tokens.issue_session(user_id).unwrap();
        let claims = state.tokens.verify_session(&session).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp, Some(claims.iat + 2 * 3600));
    }

    #[tokio::test]
    async fn test_threshold_comes_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 75.5);
        assert_eq!(state.verifier.threshold(), 75.5);
        assert_eq!(state.config.verification.similarity_threshold, 75.5);
    }
}
