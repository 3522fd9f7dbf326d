use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Session token lifetime in hours (default: 72)
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

fn default_session_ttl_hours() -> i64 {
    72
}

/// S3 bucket holding enrollment and probe photos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub prefix: String,
    pub endpoint: Option<String>,
}

/// Local directory store, for development and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBlobConfig {
    pub dir: String,
    /// Public base URL the directory is served from. `file://` URLs otherwise.
    pub base_url: Option<String>,
}

/// Photo storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobStoreConfig {
    #[serde(rename = "s3")]
    S3(S3Config),
    #[serde(rename = "local")]
    Local(LocalBlobConfig),
}

/// Face comparison backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FaceMatcherConfig {
    #[serde(rename = "rekognition")]
    Rekognition {
        region: String,
        endpoint: Option<String>,
        /// Floor passed to the comparison API; matches below it are not reported
        #[serde(default)]
        min_similarity: f32,
    },
}

/// Face verification decision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Minimum similarity (0-100, inclusive) for a probe to authenticate (default: 90.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    90.0
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Administrator to seed on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialAdminConfig {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Server configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String, // "0.0.0.0:1323"
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub blob_store: BlobStoreConfig,
    pub face_matcher: FaceMatcherConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    pub initial_admin: Option<InitialAdminConfig>,
}

impl ServerConfig {
    /// Reject combinations that would only fail at request time.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.session_ttl_hours <= 0 {
            anyhow::bail!("auth.session_ttl_hours must be positive");
        }
        let threshold = self.verification.similarity_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            anyhow::bail!(
                "verification.similarity_threshold must be within 0-100, got {}",
                threshold
            );
        }
        match (&self.face_matcher, &self.blob_store) {
            (FaceMatcherConfig::Rekognition { .. }, BlobStoreConfig::S3(_)) => Ok(()),
            (FaceMatcherConfig::Rekognition { .. }, BlobStoreConfig::Local(_)) => {
                anyhow::bail!("the rekognition face matcher requires an s3 blob_store")
            }
        }
    }
}

/// Load server config from a YAML file with FACEPASS__ env var overrides.
pub fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    use anyhow::Context;
    let config: ServerConfig = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("FACEPASS")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from: {}", path))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from: {}", path))?;
    config.validate()?;
    Ok(config)
}
