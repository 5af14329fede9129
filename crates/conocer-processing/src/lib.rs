//! Conocer Processing Library
//!
//! Turns a submitted ZIP into classified entries and a certificate PDF into
//! an [`ExtractedRecord`](conocer_core::models::ExtractedRecord).
//!
//! Everything here is synchronous and side-effect free; callers run it on a
//! blocking thread.

pub mod archive;
pub mod certificate;

pub use archive::{read_entries, ArchiveEntry, ArchiveError, EntryContent};
pub use certificate::{
    extract_from_text, parse_issue_date, FieldExtractor, PdfFieldExtractor, NO_EXTRACTABLE_TEXT,
};
