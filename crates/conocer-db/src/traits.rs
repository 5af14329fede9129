//! Repository trait abstractions
//!
//! These traits define the interface the batch worker needs from the
//! database, allowing the pipeline to be exercised against in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use conocer_core::error::AppError;
use conocer_core::models::{
    CandidateUser, CertificateRecord, CertificateUpdate, CompetencyStandard, NewCertificate,
    UploadBatch, UploadLog, UploadLogEntry,
};
use uuid::Uuid;

use crate::db::batch::UploadBatchRepository;
use crate::db::certificate::CertificateRepository;

/// Persisted `UploadBatch` rows and their append-only `UploadLog`.
#[async_trait]
pub trait BatchLedger: Send + Sync {
    /// Insert a batch row as given (normally `queued`).
    async fn create(&self, batch: &UploadBatch) -> Result<()>;

    async fn get(&self, batch_id: Uuid) -> Result<Option<UploadBatch>>;

    /// Atomically move a `queued` batch to `processing`. Returns `None` when
    /// the batch is missing or not queued.
    async fn try_start(&self, batch_id: Uuid) -> Result<Option<UploadBatch>>;

    /// Persist status, counters, timestamps and error message.
    async fn update(&self, batch: &UploadBatch) -> Result<()>;

    /// Append a log row and persist the batch counters in one transaction.
    async fn record(&self, batch: &UploadBatch, entry: &UploadLogEntry) -> Result<()>;

    /// Log rows of a batch in append order.
    async fn list_logs(&self, batch_id: Uuid) -> Result<Vec<UploadLog>>;
}

/// How a winning file lands in the certificate table.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateWrite {
    Create(NewCertificate),
    Replace {
        certificate_id: Uuid,
        update: CertificateUpdate,
    },
}

/// Everything one winner persists. Committed atomically, except the
/// assignment status which is best-effort inside the same transaction.
#[derive(Debug, Clone)]
pub struct CertificateUnitOfWork {
    pub write: CertificateWrite,
    /// Audit row; `certificate_id` is filled in by the commit
    pub log: UploadLogEntry,
    /// Batch snapshot with this winner's outcome already counted
    pub batch: UploadBatch,
    pub user_id: Uuid,
    pub standard_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CommittedCertificate {
    pub certificate: CertificateRecord,
    /// False when the tramite status update failed and was rolled back
    pub assignment_updated: bool,
}

/// Read/write slice of the certification catalog used while matching.
#[async_trait]
pub trait CertificateCatalog: Send + Sync {
    /// Case-insensitive CURP lookup.
    async fn find_user_by_curp(&self, curp: &str) -> Result<Option<CandidateUser>>;

    /// Case-insensitive ECM code lookup.
    async fn find_standard_by_code(&self, code: &str) -> Result<Option<CompetencyStandard>>;

    async fn find_active_certificate(
        &self,
        user_id: Uuid,
        ecm_code: &str,
    ) -> Result<Option<CertificateRecord>>;

    /// Whether the candidate is eligible to receive this standard's certificate.
    async fn has_pending_tramite(&self, user_id: Uuid, standard_id: Uuid) -> Result<bool>;

    /// Whether `folio` belongs to a certificate other than `excluding`.
    async fn folio_in_use(&self, folio: &str, excluding: Option<Uuid>) -> Result<bool>;

    async fn commit(&self, unit: CertificateUnitOfWork) -> Result<CommittedCertificate>;
}

// Implementations for concrete repository types

#[async_trait]
impl BatchLedger for UploadBatchRepository {
    async fn create(&self, batch: &UploadBatch) -> Result<()> {
        self.create(batch).await.map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn get(&self, batch_id: Uuid) -> Result<Option<UploadBatch>> {
        self.get(batch_id).await.map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn try_start(&self, batch_id: Uuid) -> Result<Option<UploadBatch>> {
        self.try_start(batch_id)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn update(&self, batch: &UploadBatch) -> Result<()> {
        self.update(batch).await.map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn record(&self, batch: &UploadBatch, entry: &UploadLogEntry) -> Result<()> {
        self.record(batch, entry).await
    }

    async fn list_logs(&self, batch_id: Uuid) -> Result<Vec<UploadLog>> {
        self.list_logs(batch_id)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl CertificateCatalog for CertificateRepository {
    async fn find_user_by_curp(&self, curp: &str) -> Result<Option<CandidateUser>> {
        self.find_user_by_curp(curp)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn find_standard_by_code(&self, code: &str) -> Result<Option<CompetencyStandard>> {
        self.find_standard_by_code(code)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn find_active_certificate(
        &self,
        user_id: Uuid,
        ecm_code: &str,
    ) -> Result<Option<CertificateRecord>> {
        self.find_active_certificate(user_id, ecm_code)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn has_pending_tramite(&self, user_id: Uuid, standard_id: Uuid) -> Result<bool> {
        self.has_pending_tramite(user_id, standard_id)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn folio_in_use(&self, folio: &str, excluding: Option<Uuid>) -> Result<bool> {
        self.folio_in_use(folio, excluding)
            .await
            .map_err(|e: AppError| anyhow::anyhow!(e))
    }

    async fn commit(&self, unit: CertificateUnitOfWork) -> Result<CommittedCertificate> {
        self.commit(unit).await
    }
}
