use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::upload_log::LogStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Queued => "queued",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl Display for BatchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(BatchStatus::Queued),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid batch status: {}", s)),
        }
    }
}

/// Per-outcome counters of a batch. They always sum to `processed_files`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCounters {
    pub matched: i32,
    pub replaced: i32,
    pub skipped: i32,
    pub discarded: i32,
    pub error: i32,
}

impl BatchCounters {
    pub fn total(&self) -> i32 {
        self.matched + self.replaced + self.skipped + self.discarded + self.error
    }
}

/// One ZIP submission and its processing progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub id: Uuid,
    pub uploaded_by: Uuid,
    pub filename: String,
    /// Temporary location of the submitted ZIP in the blob store
    pub blob_name: String,
    pub status: BatchStatus,
    pub total_files: i32,
    pub processed_files: i32,
    #[serde(flatten)]
    pub counters: BatchCounters,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied by whoever enqueues a batch.
#[derive(Debug, Clone)]
pub struct NewUploadBatch {
    pub uploaded_by: Uuid,
    pub filename: String,
    pub blob_name: String,
}

impl UploadBatch {
    /// Build a queued batch. `id` is chosen by the caller so the ZIP blob key
    /// can embed it before the row exists.
    pub fn queued(id: Uuid, new: NewUploadBatch) -> Self {
        Self {
            id,
            uploaded_by: new.uploaded_by,
            filename: new.filename,
            blob_name: new.blob_name,
            status: BatchStatus::Queued,
            total_files: 0,
            processed_files: 0,
            counters: BatchCounters::default(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Count one file outcome. This is the only way counters change, so
    /// `processed_files == counters.total()` holds after every call.
    pub fn record(&mut self, status: LogStatus) {
        match status {
            LogStatus::Matched => self.counters.matched += 1,
            LogStatus::Replaced => self.counters.replaced += 1,
            LogStatus::Skipped => self.counters.skipped += 1,
            LogStatus::Discarded => self.counters.discarded += 1,
            LogStatus::Error => self.counters.error += 1,
        }
        self.processed_files += 1;
    }

    pub fn mark_processing(&mut self) {
        self.status = BatchStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = BatchStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Accumulated counters are kept.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = BatchStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn counters_consistent(&self) -> bool {
        self.processed_files == self.counters.total()
            && (self.total_files == 0 || self.processed_files <= self.total_files)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for UploadBatch {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(UploadBatch {
            id: row.try_get("id")?,
            uploaded_by: row.try_get("uploaded_by")?,
            filename: row.try_get("filename")?,
            blob_name: row.try_get("blob_name")?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse batch status: {}", e).into())
            })?,
            total_files: row.try_get("total_files")?,
            processed_files: row.try_get("processed_files")?,
            counters: BatchCounters {
                matched: row.try_get("matched")?,
                replaced: row.try_get("replaced")?,
                skipped: row.try_get("skipped")?,
                discarded: row.try_get("discarded")?,
                error: row.try_get("error")?,
            },
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}
