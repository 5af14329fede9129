//! Test helpers for worker unit tests
//!
//! In-memory implementations of the ledger, catalog and storage, plus ZIP and
//! certificate fixtures. No database or object store is needed.

pub mod fixtures;
pub mod mock_catalog;
pub mod mock_ledger;
pub mod mock_storage;

pub use fixtures::*;
pub use mock_catalog::MockCatalog;
pub use mock_ledger::MockLedger;
pub use mock_storage::MockStorage;

use conocer_core::models::{NewUploadBatch, UploadBatch};
use conocer_core::WorkerSettings;
use conocer_db::BatchLedger;
use conocer_storage::keys::batch_archive_key;
use conocer_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::WorkerContext;
use crate::worker::BatchWorker;

/// Mocks wired into a [`WorkerContext`], with handles kept for assertions.
pub struct TestHarness {
    pub ledger: MockLedger,
    pub catalog: MockCatalog,
    pub storage: Arc<MockStorage>,
    pub context: WorkerContext,
}

impl TestHarness {
    pub fn new() -> Self {
        let ledger = MockLedger::new();
        let catalog = MockCatalog::with_ledger(ledger.clone());
        let storage = Arc::new(MockStorage::new());
        let context = WorkerContext::new(
            Arc::new(ledger.clone()),
            Arc::new(catalog.clone()),
            storage.clone() as Arc<dyn Storage>,
            Arc::new(TextExtractor),
            WorkerSettings::default(),
        );

        Self {
            ledger,
            catalog,
            storage,
            context,
        }
    }

    pub fn worker(&self) -> BatchWorker {
        BatchWorker::new(self.context.clone())
    }

    /// Store `zip` and create a queued batch pointing at it.
    pub async fn queue(&self, zip: Vec<u8>) -> UploadBatch {
        let id = Uuid::new_v4();
        let filename = "lote.zip".to_string();
        let blob_name = batch_archive_key(id, &filename);
        self.storage.set_file(&blob_name, zip);

        let batch = UploadBatch::queued(
            id,
            NewUploadBatch {
                uploaded_by: Uuid::new_v4(),
                filename,
                blob_name,
            },
        );
        self.ledger.create(&batch).await.unwrap();
        batch
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
