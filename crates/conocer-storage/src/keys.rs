//! Shared key generation for storage backends.

use std::path::Path;
use uuid::Uuid;

/// Number of hex characters of the content hash embedded in certificate keys.
pub const CERTIFICATE_HASH_PREFIX_LEN: usize = 12;

/// Key of a submitted ZIP: `batches/{batch_id}/{filename}`.
pub fn batch_archive_key(batch_id: Uuid, filename: &str) -> String {
    format!(
        "batches/{}/{}",
        batch_id,
        sanitize_filename(filename, "upload.zip")
    )
}

/// Key of a certificate PDF:
/// `certificates/{user_id}/{STANDARD}/{certificate_number}_{hash12}.pdf`.
///
/// The hash prefix gives each content version its own key, so uploading a
/// replacement never overwrites the blob the current row points at.
pub fn certificate_key(
    user_id: Uuid,
    standard_code: &str,
    certificate_number: &str,
    content_hash: &str,
) -> String {
    let prefix_len = content_hash.len().min(CERTIFICATE_HASH_PREFIX_LEN);
    format!(
        "certificates/{}/{}/{}_{}.pdf",
        user_id,
        key_segment(&standard_code.to_uppercase()),
        key_segment(certificate_number),
        &content_hash[..prefix_len]
    )
}

/// Strip directories from a client-supplied filename.
pub fn sanitize_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// Replace anything outside `[A-Za-z0-9_-]` so a value is safe as one key segment.
fn key_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
