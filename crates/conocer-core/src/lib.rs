//! Conocer Core Library
//!
//! Domain models, error types and configuration shared by every crate of the
//! certificate ingestion pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod text;

// Re-export commonly used types
pub use config::{IngestConfig, WorkerSettings};
pub use error::{error_chain_message, AppError};
pub use storage_types::{BlobTier, StorageBackend};
// Storage, StorageError and StorageResult live in conocer-storage
