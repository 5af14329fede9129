//! Upload batch ledger: CRUD for `upload_batches` and the append-only `upload_logs`.

use anyhow::Context;
use conocer_core::models::{UploadBatch, UploadLog, UploadLogEntry};
use conocer_core::AppError;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use super::transaction::with_transaction;

const BATCH_COLUMNS: &str = r#"
    id, uploaded_by, filename, blob_name, status, total_files, processed_files,
    matched, replaced, skipped, discarded, error, error_message,
    created_at, started_at, completed_at
"#;

/// Repository for the batch ledger tables.
#[derive(Clone)]
pub struct UploadBatchRepository {
    pool: PgPool,
}

impl UploadBatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, batch), fields(db.table = "upload_batches", db.record_id = %batch.id))]
    pub async fn create(&self, batch: &UploadBatch) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_batches (
                id, uploaded_by, filename, blob_name, status, total_files, processed_files,
                matched, replaced, skipped, discarded, error, error_message,
                created_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(batch.id)
        .bind(batch.uploaded_by)
        .bind(&batch.filename)
        .bind(&batch.blob_name)
        .bind(batch.status.as_str())
        .bind(batch.total_files)
        .bind(batch.processed_files)
        .bind(batch.counters.matched)
        .bind(batch.counters.replaced)
        .bind(batch.counters.skipped)
        .bind(batch.counters.discarded)
        .bind(batch.counters.error)
        .bind(&batch.error_message)
        .bind(batch.created_at)
        .bind(batch.started_at)
        .bind(batch.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_batches", db.record_id = %batch_id))]
    pub async fn get(&self, batch_id: Uuid) -> Result<Option<UploadBatch>, AppError> {
        let batch = sqlx::query_as::<Postgres, UploadBatch>(&format!(
            "SELECT {} FROM upload_batches WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Claim a queued batch for processing. The status guard in the WHERE
    /// clause makes a second claim of the same batch return `None`.
    #[tracing::instrument(skip(self), fields(db.table = "upload_batches", db.record_id = %batch_id))]
    pub async fn try_start(&self, batch_id: Uuid) -> Result<Option<UploadBatch>, AppError> {
        let batch = sqlx::query_as::<Postgres, UploadBatch>(&format!(
            r#"
            UPDATE upload_batches
            SET status = 'processing', started_at = NOW()
            WHERE id = $1 AND status = 'queued'
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    #[tracing::instrument(skip(self, batch), fields(db.table = "upload_batches", db.record_id = %batch.id))]
    pub async fn update(&self, batch: &UploadBatch) -> Result<(), AppError> {
        update_batch(&self.pool, batch).await?;
        Ok(())
    }

    /// Append a log row and persist the counters it contributed to, atomically.
    pub async fn record(&self, batch: &UploadBatch, entry: &UploadLogEntry) -> anyhow::Result<()> {
        let batch = batch.clone();
        let entry = entry.clone();
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                insert_log(&mut **tx, &entry).await?;
                update_batch(&mut **tx, &batch).await?;
                Ok::<_, sqlx::Error>(())
            })
        })
        .await
        .context("Failed to record file outcome")
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_logs", batch_id = %batch_id))]
    pub async fn list_logs(&self, batch_id: Uuid) -> Result<Vec<UploadLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, UploadLog>(
            r#"
            SELECT id, batch_id, filename, curp, ecm_code, name, folio, ecm_name,
                   issue_date_text, certifying_entity, status, discard_reason, discard_detail,
                   matched_user_id, certificate_id, replaced_previous_hash, processing_time_ms,
                   created_at
            FROM upload_logs
            WHERE batch_id = $1
            ORDER BY seq
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// Batches by status, oldest first. Used to find work left `queued`.
    #[tracing::instrument(skip(self), fields(db.table = "upload_batches"))]
    pub async fn list_by_status(
        &self,
        status: conocer_core::models::BatchStatus,
        limit: i64,
    ) -> Result<Vec<UploadBatch>, AppError> {
        let batches = sqlx::query_as::<Postgres, UploadBatch>(&format!(
            "SELECT {} FROM upload_batches WHERE status = $1 ORDER BY created_at LIMIT $2",
            BATCH_COLUMNS
        ))
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }
}

pub(crate) async fn update_batch<'c, E>(executor: E, batch: &UploadBatch) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE upload_batches
        SET status = $2,
            total_files = $3,
            processed_files = $4,
            matched = $5,
            replaced = $6,
            skipped = $7,
            discarded = $8,
            error = $9,
            error_message = $10,
            started_at = $11,
            completed_at = $12
        WHERE id = $1
        "#,
    )
    .bind(batch.id)
    .bind(batch.status.as_str())
    .bind(batch.total_files)
    .bind(batch.processed_files)
    .bind(batch.counters.matched)
    .bind(batch.counters.replaced)
    .bind(batch.counters.skipped)
    .bind(batch.counters.discarded)
    .bind(batch.counters.error)
    .bind(&batch.error_message)
    .bind(batch.started_at)
    .bind(batch.completed_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn insert_log<'c, E>(executor: E, entry: &UploadLogEntry) -> Result<Uuid, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO upload_logs (
            id, batch_id, filename, curp, ecm_code, name, folio, ecm_name,
            issue_date_text, certifying_entity, status, discard_reason, discard_detail,
            matched_user_id, certificate_id, replaced_previous_hash, processing_time_ms
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(id)
    .bind(entry.batch_id)
    .bind(&entry.filename)
    .bind(&entry.curp)
    .bind(&entry.ecm_code)
    .bind(&entry.name)
    .bind(&entry.folio)
    .bind(&entry.ecm_name)
    .bind(&entry.issue_date_text)
    .bind(&entry.certifying_entity)
    .bind(entry.status.as_str())
    .bind(entry.discard_reason.map(|r| r.as_str()))
    .bind(&entry.discard_detail)
    .bind(entry.matched_user_id)
    .bind(entry.certificate_id)
    .bind(&entry.replaced_previous_hash)
    .bind(entry.processing_time_ms)
    .execute(executor)
    .await?;

    Ok(id)
}
