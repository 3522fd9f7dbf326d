use anyhow::{Context, Result};
use facepass_db::{create_pool, run_migrations};
use facepass_server::config::{load_config, BlobStoreConfig, FaceMatcherConfig};
use facepass_server::face_matcher::{FaceMatcher, RekognitionMatcher};
use facepass_server::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting facepass server");

    let config_path =
        std::env::var("FACEPASS_CONFIG").unwrap_or_else(|_| "server-config.yaml".to_string());
    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;
    tracing::info!("Config loaded successfully");

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url, config.db.max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let blob_store = facepass_server::blob_store::from_config(&config.blob_store)
        .await
        .context("Failed to initialize photo storage")?;

    let face_matcher: Arc<dyn FaceMatcher> = match (&config.face_matcher, &config.blob_store) {
        (
            FaceMatcherConfig::Rekognition {
                region,
                endpoint,
                min_similarity,
            },
            BlobStoreConfig::S3(s3),
        ) => Arc::new(
            RekognitionMatcher::new(region, endpoint.as_deref(), &s3.bucket, *min_similarity)
                .await
                .context("Failed to initialize face matcher")?,
        ),
        (FaceMatcherConfig::Rekognition { .. }, BlobStoreConfig::Local(_)) => {
            anyhow::bail!("the rekognition face matcher requires an s3 blob_store")
        }
    };

    let listen = config.listen.clone();
    let initial_admin = config.initial_admin.clone();
    let state = AppState::new(pool, config, blob_store, face_matcher);
    tracing::info!(
        "Face verification threshold: {:.1}",
        state.verifier.threshold()
    );

    // Seed initial admin if configured
    if let Some(admin) = initial_admin {
        match state
            .credentials
            .ensure_admin(&admin.email, &admin.username, &admin.password)
            .await
        {
            Ok(true) => tracing::info!("Created initial admin: {}", admin.email),
            Ok(false) => tracing::info!(
                "Initial admin '{}' already exists, skipping seed",
                admin.email
            ),
            Err(e) => tracing::warn!("Failed to seed initial admin: {:#}", e),
        }
    }

    let app = facepass_server::web::build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind to {}", listen))?;

    tracing::info!("Server listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}
