//! Data models for the ingestion pipeline
//!
//! Batch ledger rows, per-file audit rows, extraction results and the
//! external certificate/candidate entities the pipeline reads and writes.

mod batch;
mod candidate;
mod certificate;
mod extracted;
mod upload_log;

pub use batch::*;
pub use candidate::*;
pub use certificate::*;
pub use extracted::*;
pub use upload_log::*;
