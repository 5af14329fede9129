//! Pass 1: scan and deduplicate.
//!
//! Reads every visible archive entry in order, extracts its fields and keeps
//! the last certificate seen for each `(CURP, ECM)` key. Runs synchronously;
//! the worker calls it on a blocking thread.

use conocer_core::models::{DiscardReason, ExtractedRecord, IdentityKey, LogStatus, UploadLogEntry};
use conocer_core::text::truncate_chars;
use conocer_core::WorkerSettings;
use conocer_processing::{read_entries, ArchiveError, EntryContent, FieldExtractor};
use std::collections::HashMap;
use uuid::Uuid;

/// An entry settled during Pass 1, with its position in the archive.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub archive_index: usize,
    pub entry: UploadLogEntry,
}

/// A certificate that survived deduplication and goes on to Pass 2.
#[derive(Debug, Clone)]
pub struct Winner {
    pub archive_index: usize,
    pub filename: String,
    pub key: IdentityKey,
    pub record: ExtractedRecord,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Visible file entries: `outcomes.len() + winners.len()`
    pub total_files: usize,
    /// Discarded and skipped entries, in the order they were decided
    pub outcomes: Vec<ScanOutcome>,
    /// In archive order of their final occurrence
    pub winners: Vec<Winner>,
}

/// Run Pass 1 over a ZIP held in memory.
///
/// Only an unreadable archive is an error; every entry ends up either in
/// `outcomes` or in `winners`.
pub fn scan_archive(
    batch_id: Uuid,
    zip: &[u8],
    extractor: &dyn FieldExtractor,
    settings: &WorkerSettings,
) -> Result<ScanReport, ArchiveError> {
    let entries = read_entries(zip, settings.max_entry_size_bytes)?;
    let total_files = entries.len();
    let detail = |text: &str| truncate_chars(text, settings.error_detail_max_chars);

    let mut outcomes = Vec::new();
    let mut candidates: Vec<Option<Winner>> = Vec::new();
    let mut seen: HashMap<IdentityKey, usize> = HashMap::new();

    for (archive_index, archive_entry) in entries.into_iter().enumerate() {
        let filename = archive_entry.name;
        let discard = |reason: DiscardReason| UploadLogEntry::discarded(batch_id, filename.clone(), reason);

        let data = match archive_entry.content {
            EntryContent::Pdf(data) => data,
            EntryContent::NotPdf => {
                outcomes.push(ScanOutcome {
                    archive_index,
                    entry: discard(DiscardReason::NotPdf),
                });
                continue;
            }
            EntryContent::TooLarge { size_bytes } => {
                tracing::debug!(filename = %filename, size_bytes, "Entry exceeds size limit");
                outcomes.push(ScanOutcome {
                    archive_index,
                    entry: discard(DiscardReason::ParseError).with_detail("entry exceeds size limit"),
                });
                continue;
            }
            EntryContent::Unreadable(error) => {
                outcomes.push(ScanOutcome {
                    archive_index,
                    entry: discard(DiscardReason::ParseError).with_detail(detail(&error)),
                });
                continue;
            }
        };

        let record = extractor.extract(&data);
        let key = match (&record.parse_error, record.identity_key()) {
            (Some(error), _) => Err(discard(DiscardReason::ParseError).with_detail(detail(error))),
            (None, Some(key)) => Ok(key),
            (None, None) if record.curp.is_none() => Err(discard(DiscardReason::NoCurp)),
            (None, None) => Err(discard(DiscardReason::NoEcmCode)),
        };
        let key = match key {
            Ok(key) => key,
            Err(entry) => {
                outcomes.push(ScanOutcome {
                    archive_index,
                    entry: entry.with_extracted(&record),
                });
                continue;
            }
        };

        if let Some(previous) = seen
            .insert(key.clone(), candidates.len())
            .and_then(|slot| candidates[slot].take())
        {
            tracing::debug!(
                key = %key,
                superseded = %previous.filename,
                by = %filename,
                "Duplicate certificate in batch"
            );
            outcomes.push(ScanOutcome {
                archive_index: previous.archive_index,
                entry: UploadLogEntry::new(batch_id, previous.filename.clone(), LogStatus::Skipped)
                    .with_reason(DiscardReason::DuplicateInBatch)
                    .with_detail(detail(&format!("superseded by {}", filename)))
                    .with_extracted(&previous.record),
            });
        }

        candidates.push(Some(Winner {
            archive_index,
            filename,
            key,
            record,
            data,
        }));
    }

    let winners: Vec<Winner> = candidates.into_iter().flatten().collect();
    tracing::info!(
        batch_id = %batch_id,
        total_files,
        settled = outcomes.len(),
        winners = winners.len(),
        "Archive scanned"
    );

    Ok(ScanReport {
        total_files,
        outcomes,
        winners,
    })
}
