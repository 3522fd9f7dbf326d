use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::config::{BlobStoreConfig, LocalBlobConfig, S3Config};

/// Location of an object written by a [`BlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Full object key, as the face matcher must reference it
    pub key: String,
    pub url: String,
}

/// Durable storage for enrollment and probe photographs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return where it landed.
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<StoredBlob>;
}

/// Content type from the image's magic bytes. PNG unless it is clearly JPEG.
pub fn image_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

/// Build the configured backend
pub async fn from_config(config: &BlobStoreConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config {
        BlobStoreConfig::S3(s3) => Arc::new(S3BlobStore::new(s3).await?),
        BlobStoreConfig::Local(local) => Arc::new(LocalBlobStore::from_config(local)),
    };
    Ok(store)
}

/// Photos in an S3 bucket (or an S3-compatible endpoint)
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    url_base: String,
}

impl S3BlobStore {
    pub async fn new(s3_config: &S3Config) -> Result<Self> {
        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(s3_config.region.clone()));

        if let Some(ref endpoint) = s3_config.endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;
        let s3_sdk_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(s3_config.endpoint.is_some())
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_sdk_config);

        tracing::info!(
            "S3 photo storage enabled: bucket={}, prefix={}",
            s3_config.bucket,
            s3_config.prefix
        );

        Ok(Self::with_client(client, s3_config))
    }

    /// Use a pre-built client (for testing)
    pub fn with_client(client: aws_sdk_s3::Client, s3_config: &S3Config) -> Self {
        let url_base = match s3_config.endpoint {
            Some(ref endpoint) => format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                s3_config.bucket
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                s3_config.bucket, s3_config.region
            ),
        };
        Self {
            client,
            bucket: s3_config.bucket.clone(),
            prefix: s3_config.prefix.clone(),
            url_base,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<StoredBlob> {
        let object_key = self.object_key(key);
        let content_type = image_content_type(&bytes);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(bytes.into())
            .send()
            .await
            .with_context(|| format!("Failed to upload photo to S3: {}", object_key))?;

        tracing::debug!("Uploaded photo to s3://{}/{}", self.bucket, object_key);
        Ok(StoredBlob {
            url: format!("{}/{}", self.url_base, object_key),
            key: object_key,
        })
    }
}

/// Photos in a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    base_url: Option<String>,
}

impl LocalBlobStore {
    pub fn new(dir: impl AsRef<Path>, base_url: Option<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            base_url,
        }
    }

    pub fn from_config(config: &LocalBlobConfig) -> Self {
        Self::new(&config.dir, config.base_url.clone())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn url_for(&self, key: &str, path: &Path) -> String {
        match self.base_url {
            Some(ref base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("file://{}", path.display()),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<StoredBlob> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            anyhow::bail!("Invalid object key: {:?}", key);
        }
        fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create photo directory")?;

        let path = self.path_for(key);
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write photo: {:?}", path))?;

        Ok(StoredBlob {
            key: key.to_string(),
            url: self.url_for(key, &path),
        })
    }
}
