//! Worker dependencies
//!
//! Everything a batch run touches is handed in through [`WorkerContext`], so
//! the pipeline runs unchanged against Postgres and object storage or against
//! the in-memory fakes used in tests.

use conocer_core::WorkerSettings;
use conocer_db::{BatchLedger, CertificateCatalog, CertificateRepository, UploadBatchRepository};
use conocer_processing::{FieldExtractor, PdfFieldExtractor};
use conocer_storage::{CertificateBlobStore, Storage};
use sqlx::PgPool;
use std::sync::Arc;

use crate::locks::IdentityKeyLocks;

#[derive(Clone)]
pub struct WorkerContext {
    pub ledger: Arc<dyn BatchLedger>,
    pub catalog: Arc<dyn CertificateCatalog>,
    pub storage: Arc<dyn Storage>,
    pub blobs: CertificateBlobStore,
    pub extractor: Arc<dyn FieldExtractor>,
    pub settings: WorkerSettings,
    /// Shared by every batch running in this process
    pub locks: IdentityKeyLocks,
}

impl WorkerContext {
    pub fn new(
        ledger: Arc<dyn BatchLedger>,
        catalog: Arc<dyn CertificateCatalog>,
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn FieldExtractor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            ledger,
            catalog,
            blobs: CertificateBlobStore::new(storage.clone()),
            storage,
            extractor,
            settings,
            locks: IdentityKeyLocks::new(),
        }
    }

    /// Production wiring: Postgres repositories and the `pdf-extract` reader.
    pub fn postgres(pool: PgPool, storage: Arc<dyn Storage>, settings: WorkerSettings) -> Self {
        let extractor = Arc::new(PdfFieldExtractor::new(settings.min_text_chars));
        Self::new(
            Arc::new(UploadBatchRepository::new(pool.clone())),
            Arc::new(CertificateRepository::new(pool)),
            storage,
            extractor,
            settings,
        )
    }
}
