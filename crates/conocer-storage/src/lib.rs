//! Conocer Storage Library
//!
//! Blob storage abstraction for the ingestion pipeline: the `Storage` trait,
//! S3 and local filesystem backends, and the certificate blob adapter built
//! on top of them.
//!
//! # Storage key format
//!
//! - **Submitted archives**: `batches/{batch_id}/{filename}`
//! - **Certificates**: `certificates/{user_id}/{ECM code}/{certificate_number}_{hash12}.pdf`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod certificates;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use certificates::{BlobStatus, CertificateBlobStore, StoredCertificate};
pub use conocer_core::{BlobTier, StorageBackend};
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{BlobMetadata, Storage, StorageError, StorageResult};
