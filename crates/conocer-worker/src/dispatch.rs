//! Batch submission and dispatch
//!
//! [`BatchDispatcher::submit`] stores an uploaded archive and records the
//! queued batch; [`BatchDispatcher::start_batch`] runs it on a background
//! task. At most `max_concurrent_batches` runs execute at once, the rest wait
//! for a permit. Dispatch is fire-and-forget: callers may drop the returned
//! handle.

use anyhow::{Context, Result};
use conocer_core::models::{NewUploadBatch, UploadBatch};
use conocer_storage::keys::batch_archive_key;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::worker::BatchWorker;

const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Clone)]
pub struct BatchDispatcher {
    worker: BatchWorker,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

/// Removes a batch from the in-flight set when its task ends, panics included.
struct InFlightGuard {
    batch_id: Uuid,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.batch_id);
    }
}

impl BatchDispatcher {
    pub fn new(worker: BatchWorker, max_concurrent_batches: usize) -> Self {
        tracing::info!(max_concurrent_batches, "Batch dispatcher started");
        Self {
            worker,
            semaphore: Arc::new(Semaphore::new(max_concurrent_batches.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn worker(&self) -> &BatchWorker {
        &self.worker
    }

    /// Store a ZIP and create its `queued` batch. Does not start processing.
    #[tracing::instrument(skip(self, zip), fields(size_bytes = zip.len()))]
    pub async fn submit(&self, uploaded_by: Uuid, filename: &str, zip: Vec<u8>) -> Result<UploadBatch> {
        let ctx = self.worker.context();
        let batch_id = Uuid::new_v4();
        let blob_name = batch_archive_key(batch_id, filename);

        ctx.storage
            .upload_with_key(&blob_name, zip, ZIP_CONTENT_TYPE)
            .await
            .context("Failed to store batch archive")?;

        let batch = UploadBatch::queued(
            batch_id,
            NewUploadBatch {
                uploaded_by,
                filename: filename.to_string(),
                blob_name,
            },
        );

        if let Err(e) = ctx.ledger.create(&batch).await {
            if let Err(delete_err) = ctx.storage.delete(&batch.blob_name).await {
                tracing::warn!(
                    blob_name = %batch.blob_name,
                    error = %delete_err,
                    "Failed to delete orphaned batch archive"
                );
            }
            return Err(e.context("Failed to create batch"));
        }

        tracing::info!(batch_id = %batch.id, filename = %batch.filename, "Batch queued");
        Ok(batch)
    }

    /// Spawn the run of `batch_id`.
    ///
    /// Returns `None` when the same batch is already running in this process.
    /// A batch that is not `queued` is rejected by the worker itself, so
    /// repeated calls never process a batch twice.
    pub fn start_batch(&self, batch_id: Uuid) -> Option<JoinHandle<Result<Option<UploadBatch>>>> {
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(batch_id) {
                tracing::debug!(batch_id = %batch_id, "Batch already dispatched");
                return None;
            }
        }

        let guard = InFlightGuard {
            batch_id,
            in_flight: self.in_flight.clone(),
        };
        let semaphore = self.semaphore.clone();
        let worker = self.worker.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("Batch dispatcher is closed")?;

            let result = worker.run(batch_id).await;
            if let Err(e) = &result {
                tracing::error!(batch_id = %batch_id, error = %e, "Batch run aborted");
            }
            result
        }))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
