//! Certificate field extraction
//!
//! [`PdfFieldExtractor`] reads the first page of a certificate PDF and hands
//! the text to [`extract_from_text`]. [`parse_issue_date`] turns the printed
//! Spanish date into a calendar date.

mod extractor;
mod issue_date;
mod patterns;

pub use extractor::{FieldExtractor, PdfFieldExtractor, NO_EXTRACTABLE_TEXT};
pub use issue_date::parse_issue_date;
pub use patterns::{extract_from_text, normalize_text};
