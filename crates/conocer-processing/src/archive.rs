//! ZIP archive reading
//!
//! Lists the entries of a submitted archive and classifies each one. Directory
//! entries and operating-system artefacts (`__MACOSX/`, dot-files, `Thumbs.db`,
//! `desktop.ini`) are dropped here and never reach the batch ledger.

use std::io::{Cursor, Read};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive is not a valid ZIP file: {0}")]
    Invalid(String),

    #[error("archive is empty")]
    Empty,
}

impl From<ZipError> for ArchiveError {
    fn from(err: ZipError) -> Self {
        ArchiveError::Invalid(err.to_string())
    }
}

/// What was read for one visible archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    /// A `.pdf` entry, fully decompressed
    Pdf(Vec<u8>),
    /// Any other file type
    NotPdf,
    /// Declared or actual uncompressed size above the configured limit
    TooLarge { size_bytes: u64 },
    /// Decompression failed
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full path inside the archive
    pub name: String,
    pub content: EntryContent,
}

/// Read every visible file entry of a ZIP held in memory, in archive order.
///
/// Fails only when the archive itself cannot be opened. Per-entry problems
/// are reported through [`EntryContent`].
pub fn read_entries(bytes: &[u8], max_entry_size: u64) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    if bytes.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                // Unreadable central directory record; the name is unknown
                entries.push(ArchiveEntry {
                    name: format!("entry-{}", index),
                    content: EntryContent::Unreadable(e.to_string()),
                });
                continue;
            }
        };

        let name = file.name().to_string();
        if file.is_dir() || is_hidden_path(&name) {
            continue;
        }

        let content = if !is_pdf_name(&name) {
            EntryContent::NotPdf
        } else if file.size() > max_entry_size {
            EntryContent::TooLarge {
                size_bytes: file.size(),
            }
        } else {
            read_limited(&mut file, max_entry_size)
        };

        entries.push(ArchiveEntry { name, content });
    }

    tracing::debug!(entries = entries.len(), "Archive listed");
    Ok(entries)
}

// The declared size comes from the archive and may lie
fn read_limited<R: Read>(reader: &mut R, max_entry_size: u64) -> EntryContent {
    let mut data = Vec::new();
    match reader.take(max_entry_size.saturating_add(1)).read_to_end(&mut data) {
        Ok(_) if data.len() as u64 > max_entry_size => EntryContent::TooLarge {
            size_bytes: data.len() as u64,
        },
        Ok(_) => EntryContent::Pdf(data),
        Err(e) => EntryContent::Unreadable(e.to_string()),
    }
}

/// True for entries that archivers add on their own and users never meant to submit.
pub fn is_hidden_path(name: &str) -> bool {
    let mut components = name.split(['/', '\\']).filter(|c| !c.is_empty()).peekable();
    while let Some(component) = components.next() {
        if component.starts_with('.') || component == "__MACOSX" {
            return true;
        }
        if components.peek().is_none() {
            let lower = component.to_ascii_lowercase();
            return lower == "thumbs.db" || lower == "desktop.ini";
        }
    }
    false
}

pub fn is_pdf_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}
