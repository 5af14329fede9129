//! Batch worker for CONOCER certificate ingestion.
//!
//! [`BatchDispatcher`] stores a submitted ZIP, creates the queued batch and
//! spawns one [`BatchWorker`] run per batch. A run scans the archive (Pass 1),
//! then matches and persists each surviving certificate (Pass 2).

pub mod context;
pub mod dispatch;
pub mod locks;
pub mod matching;
pub mod scan;
pub mod worker;

#[cfg(test)]
pub mod test_helpers;

pub use context::WorkerContext;
pub use dispatch::BatchDispatcher;
pub use locks::IdentityKeyLocks;
pub use matching::{MatchDecision, MatchResult};
pub use scan::{scan_archive, ScanOutcome, ScanReport, Winner};
pub use worker::BatchWorker;
