//! Schema introspection used after migrations to confirm the ledger tables
//! carry every column the pipeline writes.

use conocer_core::AppError;
use sqlx::PgPool;

/// Columns the worker writes, per ledger table.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "upload_batches",
        &[
            "id",
            "uploaded_by",
            "filename",
            "blob_name",
            "status",
            "total_files",
            "processed_files",
            "matched",
            "replaced",
            "skipped",
            "discarded",
            "error",
            "error_message",
            "started_at",
            "completed_at",
        ],
    ),
    (
        "upload_logs",
        &[
            "batch_id",
            "filename",
            "curp",
            "ecm_code",
            "status",
            "discard_reason",
            "discard_detail",
            "matched_user_id",
            "certificate_id",
            "replaced_previous_hash",
            "processing_time_ms",
        ],
    ),
];

#[derive(Clone)]
pub struct SchemaInspector {
    pool: PgPool,
}

impl SchemaInspector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tables in the `public` schema, sorted by name.
    #[tracing::instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.columns
                WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2
            )
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// `table.column` names from [`REQUIRED_COLUMNS`] that are missing.
    pub async fn missing_columns(&self) -> Result<Vec<String>, AppError> {
        let tables = self.list_tables().await?;
        let mut missing = Vec::new();

        for (table, columns) in REQUIRED_COLUMNS {
            if !tables.iter().any(|t| t == table) {
                missing.extend(columns.iter().map(|c| format!("{}.{}", table, c)));
                continue;
            }
            for column in columns.iter() {
                if !self.column_exists(table, column).await? {
                    missing.push(format!("{}.{}", table, column));
                }
            }
        }

        Ok(missing)
    }
}
