//! Error types module
//!
//! `AppError` is what the Postgres repositories return. File-level outcomes are
//! data (see `models::upload_log::DiscardReason`), not errors.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

/// Render an error and its `source()` chain, one cause per line, capped at five causes.
pub fn error_chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut details = err.to_string();

    let mut source = err.source();
    let mut depth = 0;
    while let Some(cause) = source {
        depth += 1;
        if depth > 5 {
            details.push_str("\n  ... (truncated)");
            break;
        }
        details.push_str(&format!("\n  Caused by: {}", cause));
        source = cause.source();
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_lists_every_context() {
        let err = anyhow::anyhow!("deadlock detected")
            .context("Failed to commit certificate")
            .context("Pass 2");
        let details = error_chain_message(&*err);
        assert_eq!(
            details,
            "Pass 2\n  Caused by: Failed to commit certificate\n  Caused by: deadlock detected"
        );
    }

    #[test]
    fn test_chain_is_capped() {
        let mut err = anyhow::anyhow!("root");
        for i in 0..8 {
            err = err.context(format!("layer {}", i));
        }
        let details = error_chain_message(&*err);
        assert!(details.starts_with("layer 7"));
        assert!(details.ends_with("... (truncated)"));
        assert_eq!(details.matches("Caused by").count(), 5);
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_database_error_keeps_source() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        let details = error_chain_message(&err);
        assert!(details.starts_with("Database error:"));
        assert!(details.contains("Caused by:"));
    }
}
