//! conocer-ingest: operator CLI for certificate batch ingestion.
//!
//! Reads configuration from the environment (or `.env`): DATABASE_URL,
//! STORAGE_BACKEND and the storage settings of the chosen backend.

use anyhow::Context;
use clap::{Parser, Subcommand};
use conocer_cli::{archive_filename, init_tracing, print_json, BatchReport};
use conocer_core::models::BatchStatus;
use conocer_core::{IngestConfig, WorkerSettings};
use conocer_db::{connect, run_migrations, SchemaInspector, UploadBatchRepository};
use conocer_processing::{FieldExtractor, PdfFieldExtractor};
use conocer_storage::create_storage;
use conocer_worker::{BatchDispatcher, BatchWorker, WorkerContext};
use sqlx::PgPool;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "conocer-ingest", about = "CONOCER certificate batch ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations and check the required columns
    Migrate,
    /// Upload a ZIP of certificates and process it in the foreground
    Submit {
        /// Path to the ZIP archive
        zip: PathBuf,
        /// UUID of the administrator submitting the batch
        #[arg(long)]
        uploaded_by: Uuid,
    },
    /// Process a batch that is still queued
    Run {
        /// Batch UUID
        batch_id: Uuid,
    },
    /// Process every queued batch, oldest first
    Resume {
        /// Maximum number of batches to pick up
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Show a batch and its counters
    Status {
        /// Batch UUID
        batch_id: Uuid,
        /// Include the per-file log rows
        #[arg(long)]
        logs: bool,
    },
    /// Print the fields extracted from one certificate PDF
    Extract {
        /// Path to the PDF
        pdf: PathBuf,
    },
}

struct Runtime {
    pool: PgPool,
    dispatcher: BatchDispatcher,
}

impl Runtime {
    async fn connect() -> anyhow::Result<Self> {
        let config = IngestConfig::from_env().context("Failed to load configuration")?;
        config.validate()?;

        let pool = connect(&config).await?;
        let storage = create_storage(&config)
            .await
            .context("Failed to initialize storage")?;
        let ctx = WorkerContext::postgres(pool.clone(), storage, config.worker.clone());
        let dispatcher = BatchDispatcher::new(BatchWorker::new(ctx), config.max_concurrent_batches);

        Ok(Self { pool, dispatcher })
    }

    async fn run_batch(&self, batch_id: Uuid) -> anyhow::Result<()> {
        let handle = self
            .dispatcher
            .start_batch(batch_id)
            .context("Batch is already running")?;
        match handle.await.context("Batch task panicked")?? {
            Some(batch) => print_json(&batch),
            None => {
                let batch = self.dispatcher.worker().context().ledger.get(batch_id).await?;
                match batch {
                    Some(batch) => {
                        tracing::warn!(
                            batch_id = %batch_id,
                            status = batch.status.as_str(),
                            "Batch was not queued; nothing to do"
                        );
                        print_json(&batch)
                    }
                    None => anyhow::bail!("Batch {} not found", batch_id),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let runtime = Runtime::connect().await?;
            run_migrations(&runtime.pool).await?;

            let inspector = SchemaInspector::new(runtime.pool.clone());
            let missing = inspector.missing_columns().await?;
            if !missing.is_empty() {
                anyhow::bail!("Schema is missing columns: {}", missing.join(", "));
            }
            let tables = inspector.list_tables().await?;
            print_json(&serde_json::json!({ "tables": tables }))?;
        }
        Commands::Submit { zip, uploaded_by } => {
            let bytes = tokio::fs::read(&zip)
                .await
                .with_context(|| format!("Failed to read {}", zip.display()))?;
            let runtime = Runtime::connect().await?;
            let batch = runtime
                .dispatcher
                .submit(uploaded_by, &archive_filename(&zip), bytes)
                .await?;
            runtime.run_batch(batch.id).await?;
        }
        Commands::Run { batch_id } => {
            let runtime = Runtime::connect().await?;
            runtime.run_batch(batch_id).await?;
        }
        Commands::Resume { limit } => {
            let runtime = Runtime::connect().await?;
            let queued = UploadBatchRepository::new(runtime.pool.clone())
                .list_by_status(BatchStatus::Queued, limit)
                .await?;
            tracing::info!(count = queued.len(), "Resuming queued batches");

            let handles: Vec<_> = queued
                .iter()
                .filter_map(|batch| runtime.dispatcher.start_batch(batch.id))
                .collect();
            let mut finished = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.await {
                    Ok(Ok(Some(batch))) => finished.push(batch),
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "Batch run aborted"),
                    Err(e) => tracing::error!(error = %e, "Batch task panicked"),
                }
            }
            print_json(&finished)?;
        }
        Commands::Status { batch_id, logs } => {
            let runtime = Runtime::connect().await?;
            let ledger = runtime.dispatcher.worker().context().ledger.clone();
            let batch = ledger
                .get(batch_id)
                .await?
                .with_context(|| format!("Batch {} not found", batch_id))?;
            let logs = if logs {
                Some(ledger.list_logs(batch_id).await?)
            } else {
                None
            };
            print_json(&BatchReport { batch, logs })?;
        }
        Commands::Extract { pdf } => {
            let data = tokio::fs::read(&pdf)
                .await
                .with_context(|| format!("Failed to read {}", pdf.display()))?;
            let min_text_chars = IngestConfig::from_env()
                .map(|config| config.worker.min_text_chars)
                .unwrap_or(WorkerSettings::default().min_text_chars);
            let record = PdfFieldExtractor::new(min_text_chars).extract(&data);
            print_json(&record)?;
        }
    }

    Ok(())
}
