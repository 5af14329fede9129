//! In-memory batch ledger

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use conocer_core::models::{BatchStatus, UploadBatch, UploadLog, UploadLogEntry};
use conocer_db::BatchLedger;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock ledger; `record` is atomic like the Postgres transaction it stands for.
#[derive(Clone, Default)]
pub struct MockLedger {
    batches: Arc<Mutex<HashMap<Uuid, UploadBatch>>>,
    logs: Arc<Mutex<Vec<UploadLog>>>,
    failing_filenames: Arc<Mutex<HashSet<String>>>,
    failing_statuses: Arc<Mutex<HashSet<BatchStatus>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record` fail for log rows about `filename`.
    pub fn fail_record_for(&self, filename: &str) {
        self.failing_filenames
            .lock()
            .unwrap()
            .insert(filename.to_string());
    }

    /// Make `update` fail for snapshots carrying `status`.
    pub fn fail_updates_to(&self, status: BatchStatus) {
        self.failing_statuses.lock().unwrap().insert(status);
    }

    pub fn batch(&self, batch_id: Uuid) -> Option<UploadBatch> {
        self.batches.lock().unwrap().get(&batch_id).cloned()
    }

    pub fn logs(&self, batch_id: Uuid) -> Vec<UploadLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.entry.batch_id == batch_id)
            .cloned()
            .collect()
    }

    /// Write a log row and batch snapshot together. Used by the mock catalog's commit.
    pub fn store(&self, batch: &UploadBatch, entry: &UploadLogEntry) -> Uuid {
        let id = self.push_log(entry);
        self.batches.lock().unwrap().insert(batch.id, batch.clone());
        id
    }

    fn push_log(&self, entry: &UploadLogEntry) -> Uuid {
        let id = Uuid::new_v4();
        self.logs.lock().unwrap().push(UploadLog {
            id,
            entry: entry.clone(),
            created_at: Utc::now(),
        });
        id
    }
}

#[async_trait]
impl BatchLedger for MockLedger {
    async fn create(&self, batch: &UploadBatch) -> Result<()> {
        self.batches.lock().unwrap().insert(batch.id, batch.clone());
        Ok(())
    }

    async fn get(&self, batch_id: Uuid) -> Result<Option<UploadBatch>> {
        Ok(self.batch(batch_id))
    }

    async fn try_start(&self, batch_id: Uuid) -> Result<Option<UploadBatch>> {
        let mut batches = self.batches.lock().unwrap();
        match batches.get_mut(&batch_id) {
            Some(batch) if batch.status == BatchStatus::Queued => {
                batch.mark_processing();
                Ok(Some(batch.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update(&self, batch: &UploadBatch) -> Result<()> {
        if self.failing_statuses.lock().unwrap().contains(&batch.status) {
            anyhow::bail!("connection reset while updating batch");
        }
        self.batches.lock().unwrap().insert(batch.id, batch.clone());
        Ok(())
    }

    async fn record(&self, batch: &UploadBatch, entry: &UploadLogEntry) -> Result<()> {
        if self
            .failing_filenames
            .lock()
            .unwrap()
            .contains(&entry.filename)
        {
            anyhow::bail!("connection reset while writing upload log");
        }
        self.store(batch, entry);
        Ok(())
    }

    async fn list_logs(&self, batch_id: Uuid) -> Result<Vec<UploadLog>> {
        Ok(self.logs(batch_id))
    }
}
