use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const RECORD_COLUMNS: &str =
    "record_id, user_id, reference_url, reference_key, probe_url, probe_key, similarity, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationRecordRow {
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub reference_url: String,
    pub reference_key: String,
    pub probe_url: String,
    pub probe_key: String,
    pub similarity: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVerificationRecord<'a> {
    pub user_id: Uuid,
    pub reference_url: &'a str,
    pub reference_key: &'a str,
    pub probe_url: &'a str,
    pub probe_key: &'a str,
    pub similarity: f64,
}

/// Append-only audit log of face comparisons
pub struct VerificationRecordRepo;

impl VerificationRecordRepo {
    /// Append one record in its own transaction and return its id.
    pub async fn create(pool: &PgPool, record: &NewVerificationRecord<'_>) -> Result<Uuid> {
        let record_id = Uuid::new_v4();
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            r#"
            INSERT INTO verification_record
                (record_id, user_id, reference_url, reference_key, probe_url, probe_key, similarity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record_id)
        .bind(record.user_id)
        .bind(record.reference_url)
        .bind(record.reference_key)
        .bind(record.probe_url)
        .bind(record.probe_key)
        .bind(record.similarity)
        .execute(&mut *tx)
        .await
        .context("Failed to create verification record")?;
        tx.commit()
            .await
            .context("Failed to commit verification record")?;
        Ok(record_id)
    }

    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<VerificationRecordRow>> {
        let rows = sqlx::query_as::<_, VerificationRecordRow>(&format!(
            "SELECT {} FROM verification_record WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list verification records")?;
        Ok(rows)
    }

    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM verification_record WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await
                .context("Failed to count verification records")?;
        Ok(count)
    }
}
