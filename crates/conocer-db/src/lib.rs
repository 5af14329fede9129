//! Conocer DB Library
//!
//! Postgres persistence for the ingestion pipeline: the batch ledger, the
//! upload log, and the narrow slice of the certification catalog the worker
//! reads and writes.

pub mod db;
pub mod traits;

pub use db::{
    connect, run_migrations, CertificateRepository, SchemaInspector, UploadBatchRepository,
};
pub use traits::{
    BatchLedger, CertificateCatalog, CertificateUnitOfWork, CertificateWrite, CommittedCertificate,
};
