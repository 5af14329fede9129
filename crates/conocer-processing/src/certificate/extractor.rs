//! PDF text extraction for certificate PDFs.

use conocer_core::models::ExtractedRecord;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::patterns::extract_from_text;

/// Reason recorded when the first page carries too little text to read.
pub const NO_EXTRACTABLE_TEXT: &str = "no extractable text";

/// Turns certificate bytes into extracted fields.
///
/// Implementations never fail: problems are reported through
/// [`ExtractedRecord::parse_error`].
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> ExtractedRecord;
}

/// Reads the first page's text layer with `pdf-extract`.
#[derive(Debug, Clone)]
pub struct PdfFieldExtractor {
    min_text_chars: usize,
}

impl PdfFieldExtractor {
    pub fn new(min_text_chars: usize) -> Self {
        Self { min_text_chars }
    }

    fn first_page_text(&self, data: &[u8]) -> Result<String, String> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err("not a PDF document".to_string());
        }

        // pdf-extract panics on some malformed fonts and xref tables
        let pages = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }))
        .map_err(|_| "PDF parser panicked".to_string())?
        .map_err(|e| format!("failed to read PDF: {}", e))?;

        Ok(pages.into_iter().next().unwrap_or_default())
    }
}

impl FieldExtractor for PdfFieldExtractor {
    fn extract(&self, data: &[u8]) -> ExtractedRecord {
        let text = match self.first_page_text(data) {
            Ok(text) => text,
            Err(message) => {
                tracing::debug!(error = %message, "PDF text extraction failed");
                return ExtractedRecord::failed(message);
            }
        };

        let significant = text.chars().filter(|c| !c.is_whitespace()).count();
        if significant < self.min_text_chars {
            tracing::debug!(chars = significant, "First page has no usable text layer");
            return ExtractedRecord::failed(NO_EXTRACTABLE_TEXT);
        }

        extract_from_text(&text)
    }
}
