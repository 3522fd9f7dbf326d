use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_rekognition::error::SdkError;
use aws_sdk_rekognition::types::{Image, S3Object};

/// What a face comparison produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    /// Similarity between the two faces, 0-100
    Similarity(f64),
    /// One of the images has no detectable face
    NoFace,
}

impl MatchOutcome {
    /// Score recorded for this outcome. No face counts as zero similarity.
    pub fn score(self) -> f64 {
        match self {
            MatchOutcome::Similarity(s) => s.clamp(0.0, 100.0),
            MatchOutcome::NoFace => 0.0,
        }
    }
}

/// Opaque biometric comparison of two stored photos
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Compare the enrollment photo at `reference_key` with the probe at `probe_key`.
    async fn compare(&self, reference_key: &str, probe_key: &str) -> Result<MatchOutcome>;
}

/// Face comparison through AWS Rekognition `CompareFaces`, reading both
/// images straight from the photo bucket.
#[derive(Clone)]
pub struct RekognitionMatcher {
    client: aws_sdk_rekognition::Client,
    bucket: String,
    min_similarity: f32,
}

impl RekognitionMatcher {
    pub async fn new(
        region: &str,
        endpoint: Option<&str>,
        bucket: &str,
        min_similarity: f32,
    ) -> Result<Self> {
        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_rekognition::config::Region::new(region.to_string()));

        if let Some(endpoint) = endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;
        let client = aws_sdk_rekognition::Client::new(&aws_config);

        tracing::info!(
            "Rekognition face matcher enabled: region={}, bucket={}",
            region,
            bucket
        );

        Ok(Self::with_client(client, bucket, min_similarity))
    }

    /// Use a pre-built client (for testing)
    pub fn with_client(client: aws_sdk_rekognition::Client, bucket: &str, min_similarity: f32) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            min_similarity,
        }
    }

    fn image(&self, key: &str) -> Image {
        Image::builder()
            .s3_object(S3Object::builder().bucket(&self.bucket).name(key).build())
            .build()
    }
}

#[async_trait]
impl FaceMatcher for RekognitionMatcher {
    async fn compare(&self, reference_key: &str, probe_key: &str) -> Result<MatchOutcome> {
        let response = self
            .client
            .compare_faces()
            .similarity_threshold(self.min_similarity)
            .source_image(self.image(reference_key))
            .target_image(self.image(probe_key))
            .send()
            .await;

        match response {
            Ok(output) => {
                let best = output
                    .face_matches()
                    .iter()
                    .filter_map(|m| m.similarity())
                    .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))));
                match best {
                    Some(similarity) => {
                        tracing::debug!("Rekognition best similarity {:.2}", similarity);
                        Ok(MatchOutcome::Similarity(f64::from(similarity)))
                    }
                    None => {
                        tracing::debug!("Rekognition returned no face matches");
                        Ok(MatchOutcome::Similarity(0.0))
                    }
                }
            }
            Err(sdk_err) => {
                if let SdkError::ServiceError(ref service_err) = sdk_err {
                    if service_err.err().is_invalid_parameter_exception() {
                        tracing::info!("Rekognition found no face in one of the images");
                        return Ok(MatchOutcome::NoFace);
                    }
                }
                Err(anyhow::anyhow!("Rekognition CompareFaces failed: {}", sdk_err))
            }
        }
    }
}
