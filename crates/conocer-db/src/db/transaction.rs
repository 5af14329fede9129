//! Database transaction utilities
//!
//! Helpers for multi-step writes that must land atomically, such as a
//! certificate write together with its audit row and the batch counters.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};

/// Execute a closure within a database transaction
///
/// Begins a transaction, runs the closure, and commits on success or rolls
/// back on error.
///
/// # Example
///
/// ```ignore
/// use conocer_db::db::transaction::with_transaction;
///
/// async fn example(pool: &sqlx::PgPool) -> anyhow::Result<()> {
///     with_transaction(pool, |tx| Box::pin(async move {
///         sqlx::query("INSERT INTO ...").execute(&mut **tx).await?;
///         sqlx::query("UPDATE ...").execute(&mut **tx).await?;
///         Ok::<_, sqlx::Error>(())
///     })).await
/// }
/// ```
pub async fn with_transaction<F, R, E>(pool: &PgPool, f: F) -> Result<R>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<R, E>> + Send + 'a>,
    >,
    E: Into<anyhow::Error>,
{
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await.context("Failed to commit transaction")?;
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(e.into())
        }
    }
}

/// Run `f` inside a named savepoint; its failure rolls back to the savepoint
/// and leaves the enclosing transaction usable.
///
/// Returns `Ok(true)` when `f` succeeded, `Ok(false)` when it was rolled back.
pub async fn best_effort_savepoint<F, E>(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    f: F,
) -> Result<bool>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<(), E>> + Send + 'a>,
    >,
    E: std::fmt::Display,
{
    sqlx::query(&format!("SAVEPOINT {}", name))
        .execute(&mut **tx)
        .await
        .context("Failed to create savepoint")?;

    match f(&mut *tx).await {
        Ok(()) => {
            sqlx::query(&format!("RELEASE SAVEPOINT {}", name))
                .execute(&mut **tx)
                .await
                .context("Failed to release savepoint")?;
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(savepoint = name, error = %e, "Rolling back to savepoint");
            sqlx::query(&format!("ROLLBACK TO SAVEPOINT {}", name))
                .execute(&mut **tx)
                .await
                .context("Failed to roll back to savepoint")?;
            Ok(false)
        }
    }
}
