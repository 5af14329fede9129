//! Database repositories for data access layer
//!
//! `batch` owns the ledger tables (`upload_batches`, `upload_logs`);
//! `certificate` reads and writes the certification catalog tables, which
//! belong to the certification service.
//
// Ledger and audit trail
pub mod batch;
//
// Certification catalog
pub mod certificate;
//
// Pool construction, migrations and schema introspection
pub mod schema;
pub mod setup;
//
// Transaction utilities
pub mod transaction;

pub use batch::UploadBatchRepository;
pub use certificate::CertificateRepository;
pub use schema::SchemaInspector;
pub use setup::{connect, run_migrations};
