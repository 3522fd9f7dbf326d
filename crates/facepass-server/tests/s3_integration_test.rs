use anyhow::Result;
use facepass_server::blob_store::{BlobStore, S3BlobStore};
use facepass_server::config::S3Config;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::minio::MinIO;
use uuid::Uuid;

// ─── Helpers ────────────────────────────────────────────────────────────

const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

async fn setup_minio() -> Result<(testcontainers::ContainerAsync<MinIO>, String)> {
    let container = MinIO::default().start().await?;
    let port = container.get_host_port_ipv4(9000).await?;
    let endpoint = format!("http://127.0.0.1:{}", port);
    Ok((container, endpoint))
}

fn test_s3_client(endpoint: &str) -> aws_sdk_s3::Client {
    let creds =
        aws_sdk_s3::config::Credentials::new("minioadmin", "minioadmin", None, None, "test");
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .endpoint_url(endpoint)
        .credentials_provider(creds)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

async fn create_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> Result<()> {
    client.create_bucket().bucket(bucket).send().await?;
    Ok(())
}

fn s3_config(bucket: &str, prefix: &str, endpoint: &str) -> S3Config {
    S3Config {
        bucket: bucket.to_string(),
        region: "us-east-1".to_string(),
        prefix: prefix.to_string(),
        endpoint: Some(endpoint.to_string()),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_s3_put_stores_photo() -> Result<()> {
    let (_container, endpoint) = setup_minio().await?;
    let bucket = format!("test-{}", Uuid::new_v4());
    let client = test_s3_client(&endpoint);
    create_bucket(&client, &bucket).await?;

    let store = S3BlobStore::with_client(client.clone(), &s3_config(&bucket, "", &endpoint));
    let key = Uuid::new_v4().to_string();
    let blob = store.put(JPEG_HEADER.to_vec(), &key).await?;

    assert_eq!(blob.key, key);
    assert_eq!(blob.url, format!("{}/{}/{}", endpoint, bucket, key));

    let object = client.get_object().bucket(&bucket).key(&key).send().await?;
    assert_eq!(object.content_type(), Some("image/jpeg"));
    let body = object.body.collect().await?.into_bytes();
    assert_eq!(body.as_ref(), JPEG_HEADER);

    Ok(())
}

#[tokio::test]
async fn test_s3_put_applies_prefix() -> Result<()> {
    let (_container, endpoint) = setup_minio().await?;
    let bucket = format!("test-{}", Uuid::new_v4());
    let client = test_s3_client(&endpoint);
    create_bucket(&client, &bucket).await?;

    let store =
        S3BlobStore::with_client(client.clone(), &s3_config(&bucket, "photos/", &endpoint));
    let blob = store.put(vec![0x89, b'P', b'N', b'G'], "probe-1").await?;

    // The returned key is the full object key the face matcher reads
    assert_eq!(blob.key, "photos/probe-1");

    let object = client
        .get_object()
        .bucket(&bucket)
        .key("photos/probe-1")
        .send()
        .await?;
    assert_eq!(object.content_type(), Some("image/png"));

    Ok(())
}

#[tokio::test]
async fn test_s3_put_missing_bucket_fails() -> Result<()> {
    let (_container, endpoint) = setup_minio().await?;
    let client = test_s3_client(&endpoint);

    let store = S3BlobStore::with_client(client, &s3_config("no-such-bucket", "", &endpoint));
    assert!(store.put(vec![1, 2, 3], "k").await.is_err());

    Ok(())
}
