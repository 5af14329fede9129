//! Configuration module
//!
//! Environment-driven configuration for the ingestion pipeline: database,
//! storage backend and the knobs of the batch worker.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_BATCHES: usize = 2;
const MIN_EXTRACTABLE_TEXT_CHARS: usize = 50;
const ERROR_DETAIL_MAX_CHARS: usize = 500;
const MAX_ENTRY_SIZE_MB: u64 = 25;

/// Processing knobs handed to the batch worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Page text shorter than this is treated as "no extractable text"
    pub min_text_chars: usize,
    /// Upper bound for per-file error detail and batch error messages
    pub error_detail_max_chars: usize,
    /// ZIP entries larger than this (uncompressed) are discarded unread
    pub max_entry_size_bytes: u64,
}

/// Megabytes to bytes, clamped at `u64::MAX`.
fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            min_text_chars: MIN_EXTRACTABLE_TEXT_CHARS,
            error_detail_max_chars: ERROR_DETAIL_MAX_CHARS,
            max_entry_size_bytes: mb_to_bytes(MAX_ENTRY_SIZE_MB),
        }
    }
}

/// Ingestion service configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    // Worker configuration
    pub max_concurrent_batches: usize,
    pub worker: WorkerSettings,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => Some(value.parse::<StorageBackend>()?),
            Err(_) => None,
        };

        let max_entry_size_mb = env::var("MAX_ENTRY_SIZE_MB")
            .unwrap_or_else(|_| MAX_ENTRY_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_ENTRY_SIZE_MB);

        let worker = WorkerSettings {
            min_text_chars: env::var("MIN_EXTRACTABLE_TEXT_CHARS")
                .unwrap_or_else(|_| MIN_EXTRACTABLE_TEXT_CHARS.to_string())
                .parse()
                .unwrap_or(MIN_EXTRACTABLE_TEXT_CHARS),
            error_detail_max_chars: env::var("ERROR_DETAIL_MAX_CHARS")
                .unwrap_or_else(|_| ERROR_DETAIL_MAX_CHARS.to_string())
                .parse()
                .unwrap_or(ERROR_DETAIL_MAX_CHARS),
            max_entry_size_bytes: mb_to_bytes(max_entry_size_mb),
        };

        Ok(IngestConfig {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            max_concurrent_batches: env::var("MAX_CONCURRENT_BATCHES")
                .unwrap_or_else(|_| MAX_CONCURRENT_BATCHES.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_BATCHES),
            worker,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    /// Effective S3 region: `S3_REGION`, then `AWS_REGION`.
    pub fn effective_s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_concurrent_batches == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_BATCHES must be at least 1"
            ));
        }

        if self.worker.error_detail_max_chars < 16 {
            return Err(anyhow::anyhow!(
                "ERROR_DETAIL_MAX_CHARS must be at least 16"
            ));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.effective_s3_region().is_none() && self.s3_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
