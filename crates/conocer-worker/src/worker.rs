//! Batch worker
//!
//! Drives one batch from `processing` to a terminal status:
//!
//! 1. Claim the batch (`queued → processing`); a batch that is not queued is left alone.
//! 2. Download the archive and run Pass 1 on a blocking thread.
//! 3. Record every Pass 1 outcome, then match and persist each winner.
//! 4. Mark the batch `completed` and drop the archive blob, or `failed` with
//!    the error that stopped the run.
//!
//! Per-file problems become log rows and never stop the batch. Only errors the
//! ledger itself cannot absorb fail it.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use conocer_core::models::{
    CandidateUser, CertificateRecord, CertificateUpdate, CompetencyStandard, DiscardReason,
    ExtractedRecord, LogStatus, NewCertificate, UploadBatch, UploadLogEntry,
};
use conocer_core::text::truncate_chars;
use conocer_core::{error_chain_message, BlobTier};
use conocer_db::{CertificateUnitOfWork, CertificateWrite, CommittedCertificate};
use conocer_processing::parse_issue_date;
use conocer_storage::{BlobMetadata, StoredCertificate};
use std::time::Instant;
use uuid::Uuid;

use crate::context::WorkerContext;
use crate::matching::{MatchDecision, MatchResult};
use crate::scan::{scan_archive, Winner};

/// Tier of every newly uploaded certificate blob.
const INITIAL_TIER: BlobTier = BlobTier::Cool;

#[derive(Clone)]
pub struct BatchWorker {
    ctx: WorkerContext,
}

impl BatchWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Process a queued batch to completion.
    ///
    /// Returns the batch in its terminal state, or `None` when the batch was
    /// missing or not `queued`. An `Err` means not even the `failed` status
    /// could be written.
    #[tracing::instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn run(&self, batch_id: Uuid) -> Result<Option<UploadBatch>> {
        let Some(mut batch) = self
            .ctx
            .ledger
            .try_start(batch_id)
            .await
            .context("Failed to claim batch")?
        else {
            tracing::info!("Batch is not queued, skipping");
            return Ok(None);
        };

        tracing::info!(filename = %batch.filename, "Batch processing started");
        let started = Instant::now();

        let outcome = match self.process(&mut batch).await {
            Ok(()) => self.complete(&mut batch, started).await,
            Err(e) => Err(e),
        };

        // Also reached when the `completed` write itself failed, so the row
        // never stays `processing`
        if let Err(e) = outcome {
            let message = truncate_chars(
                &error_chain_message(&*e),
                self.ctx.settings.error_detail_max_chars,
            );
            tracing::error!(
                error = %message,
                processed_files = batch.processed_files,
                duration_ms = elapsed_ms(started),
                "Batch failed"
            );
            batch.mark_failed(message);
            self.ctx
                .ledger
                .update(&batch)
                .await
                .context("Failed to mark batch failed")?;
        }

        Ok(Some(batch))
    }

    async fn complete(&self, batch: &mut UploadBatch, started: Instant) -> Result<()> {
        let mut completed = batch.clone();
        completed.mark_completed();
        self.ctx
            .ledger
            .update(&completed)
            .await
            .context("Failed to mark batch completed")?;
        *batch = completed;

        tracing::info!(
            duration_ms = elapsed_ms(started),
            total_files = batch.total_files,
            processed_files = batch.processed_files,
            matched = batch.counters.matched,
            replaced = batch.counters.replaced,
            skipped = batch.counters.skipped,
            discarded = batch.counters.discarded,
            error = batch.counters.error,
            "Batch completed"
        );
        self.drop_archive(batch).await;
        Ok(())
    }

    async fn process(&self, batch: &mut UploadBatch) -> Result<()> {
        let zip = self
            .ctx
            .storage
            .download(&batch.blob_name)
            .await
            .with_context(|| format!("Failed to download archive {}", batch.blob_name))?;

        let extractor = self.ctx.extractor.clone();
        let settings = self.ctx.settings.clone();
        let batch_id = batch.id;
        let report = tokio::task::spawn_blocking(move || {
            scan_archive(batch_id, &zip, extractor.as_ref(), &settings)
        })
        .await
        .context("Archive scan task panicked")??;

        batch.total_files =
            i32::try_from(report.total_files).context("Archive has too many entries")?;
        self.ctx
            .ledger
            .update(batch)
            .await
            .context("Failed to record archive size")?;

        for outcome in report.outcomes {
            self.record(batch, outcome.entry).await?;
        }

        for winner in report.winners {
            self.process_winner(batch, winner).await?;
        }

        Ok(())
    }

    /// Append a log row and count it. The in-memory counters only move once
    /// the ledger has accepted the row.
    async fn record(&self, batch: &mut UploadBatch, entry: UploadLogEntry) -> Result<()> {
        let mut snapshot = batch.clone();
        snapshot.record(entry.status);
        self.ctx
            .ledger
            .record(&snapshot, &entry)
            .await
            .with_context(|| format!("Failed to record outcome of {}", entry.filename))?;
        *batch = snapshot;
        Ok(())
    }

    /// Pass 2 for one winner. Anything that goes wrong is turned into an
    /// `error` row; only a failure to write that row escapes.
    #[tracing::instrument(
        skip(self, batch, winner),
        fields(filename = %winner.filename, curp = %winner.key.curp, ecm_code = %winner.key.ecm_code)
    )]
    async fn process_winner(&self, batch: &mut UploadBatch, winner: Winner) -> Result<()> {
        let _guard = self.ctx.locks.lock(&winner.key).await;
        let started = Instant::now();
        let filename = winner.filename.clone();
        let record = winner.record.clone();

        match self.settle_winner(batch, winner, started).await {
            Ok(status) => {
                tracing::debug!(status = %status, duration_ms = elapsed_ms(started), "Certificate settled");
                Ok(())
            }
            Err(e) => {
                let detail = truncate_chars(
                    &error_chain_message(&*e),
                    self.ctx.settings.error_detail_max_chars,
                );
                tracing::warn!(error = %detail, "Failed to process certificate");
                let mut entry = UploadLogEntry::new(batch.id, filename, LogStatus::Error)
                    .with_reason(DiscardReason::ProcessingError)
                    .with_detail(detail)
                    .with_extracted(&record);
                entry.processing_time_ms = Some(elapsed_ms(started));
                self.record(batch, entry).await
            }
        }
    }

    async fn settle_winner(
        &self,
        batch: &mut UploadBatch,
        winner: Winner,
        started: Instant,
    ) -> Result<LogStatus> {
        let lookup = MatchResult::lookup(self.ctx.catalog.as_ref(), &winner.key).await?;

        let existing = match lookup.decision() {
            MatchDecision::Discard(reason) => {
                let mut entry = UploadLogEntry::discarded(batch.id, winner.filename, reason)
                    .with_extracted(&winner.record);
                entry.matched_user_id = lookup.user.as_ref().map(|u| u.id);
                entry.processing_time_ms = Some(elapsed_ms(started));
                self.record(batch, entry).await?;
                return Ok(LogStatus::Discarded);
            }
            MatchDecision::Create => None,
            MatchDecision::Replace(existing) => Some(existing),
        };

        let (Some(user), Some(standard)) = (lookup.user, lookup.standard) else {
            anyhow::bail!("catalog match for {} is incomplete", winner.key);
        };

        match existing {
            None => {
                self.create_certificate(batch, winner, &user, &standard, started)
                    .await
            }
            Some(existing) => {
                self.replace_certificate(batch, winner, &user, &standard, existing, started)
                    .await
            }
        }
    }

    async fn create_certificate(
        &self,
        batch: &mut UploadBatch,
        winner: Winner,
        user: &CandidateUser,
        standard: &CompetencyStandard,
        started: Instant,
    ) -> Result<LogStatus> {
        let Winner {
            filename,
            record,
            data,
            ..
        } = winner;

        let today = Utc::now().date_naive();
        let certificate_number = new_certificate_number(&standard.code, today);
        let folio = self.available_folio(record.folio.as_deref(), None).await?;
        let issue_date = record
            .issue_date_text
            .as_deref()
            .and_then(parse_issue_date)
            .unwrap_or(today);

        let stored = self
            .upload(batch.id, data, user.id, &standard.code, &certificate_number)
            .await?;

        let write = CertificateWrite::Create(NewCertificate {
            user_id: user.id,
            standard_id: standard.id,
            ecm_code: standard.code.clone(),
            certificate_number,
            folio,
            issue_date,
            standard_name: record.ecm_name.clone().or_else(|| Some(standard.name.clone())),
            certifying_entity: record.certifying_entity.clone(),
            blob_name: stored.blob_name.clone(),
            content_hash: stored.content_hash.clone(),
            size_bytes: stored.size_bytes,
            storage_tier: INITIAL_TIER,
        });
        let log = success_entry(batch.id, filename, &record, LogStatus::Matched, user.id);

        match self.commit(batch, write, log, user.id, standard.id, started).await {
            Ok(committed) => {
                tracing::info!(
                    certificate_id = %committed.certificate.id,
                    certificate_number = %committed.certificate.certificate_number,
                    assignment_updated = committed.assignment_updated,
                    "Certificate created"
                );
                Ok(LogStatus::Matched)
            }
            Err(e) => {
                self.delete_blob_best_effort(&stored.blob_name).await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn replace_certificate(
        &self,
        batch: &mut UploadBatch,
        winner: Winner,
        user: &CandidateUser,
        standard: &CompetencyStandard,
        existing: CertificateRecord,
        started: Instant,
    ) -> Result<LogStatus> {
        let Winner {
            filename,
            record,
            data,
            ..
        } = winner;

        let folio = self
            .available_folio(record.folio.as_deref(), Some(existing.id))
            .await?;

        let stored = self
            .upload(batch.id, data, user.id, &standard.code, &existing.certificate_number)
            .await?;

        let write = CertificateWrite::Replace {
            certificate_id: existing.id,
            update: CertificateUpdate {
                blob_name: stored.blob_name.clone(),
                content_hash: stored.content_hash.clone(),
                size_bytes: stored.size_bytes,
                storage_tier: INITIAL_TIER,
                folio,
                issue_date: record.issue_date_text.as_deref().and_then(parse_issue_date),
                standard_name: record.ecm_name.clone(),
                certifying_entity: record.certifying_entity.clone(),
            },
        };
        let mut log = success_entry(batch.id, filename, &record, LogStatus::Replaced, user.id);
        log.replaced_previous_hash = Some(existing.content_hash.clone());

        // Identical content maps to the same blob name
        let same_blob = stored.blob_name == existing.blob_name;

        match self.commit(batch, write, log, user.id, standard.id, started).await {
            Ok(committed) => {
                tracing::info!(
                    certificate_id = %committed.certificate.id,
                    previous_hash = %existing.content_hash,
                    assignment_updated = committed.assignment_updated,
                    "Certificate replaced"
                );
                if !same_blob {
                    self.delete_blob_best_effort(&existing.blob_name).await;
                }
                Ok(LogStatus::Replaced)
            }
            Err(e) => {
                if !same_blob {
                    self.delete_blob_best_effort(&stored.blob_name).await;
                }
                Err(e)
            }
        }
    }

    /// Commit the certificate write together with its log row and the batch
    /// counters that include it.
    async fn commit(
        &self,
        batch: &mut UploadBatch,
        write: CertificateWrite,
        mut log: UploadLogEntry,
        user_id: Uuid,
        standard_id: Uuid,
        started: Instant,
    ) -> Result<CommittedCertificate> {
        log.processing_time_ms = Some(elapsed_ms(started));
        let mut snapshot = batch.clone();
        snapshot.record(log.status);

        let committed = self
            .ctx
            .catalog
            .commit(CertificateUnitOfWork {
                write,
                log,
                batch: snapshot.clone(),
                user_id,
                standard_id,
            })
            .await
            .context("Failed to commit certificate")?;

        *batch = snapshot;
        Ok(committed)
    }

    /// The folio to store, or `None` when another certificate already holds it.
    async fn available_folio(&self, folio: Option<&str>, owner: Option<Uuid>) -> Result<Option<String>> {
        let Some(folio) = folio else {
            return Ok(None);
        };
        if self
            .ctx
            .catalog
            .folio_in_use(folio, owner)
            .await
            .context("Failed to check folio")?
        {
            tracing::debug!(folio, "Folio belongs to another certificate, leaving it unchanged");
            return Ok(None);
        }
        Ok(Some(folio.to_string()))
    }

    async fn upload(
        &self,
        batch_id: Uuid,
        data: Vec<u8>,
        user_id: Uuid,
        standard_code: &str,
        certificate_number: &str,
    ) -> Result<StoredCertificate> {
        let metadata = BlobMetadata::from([
            ("batch-id".to_string(), batch_id.to_string()),
            ("user-id".to_string(), user_id.to_string()),
            ("ecm-code".to_string(), standard_code.to_uppercase()),
            ("certificate-number".to_string(), certificate_number.to_string()),
        ]);

        self.ctx
            .blobs
            .upload_certificate(data, user_id, certificate_number, standard_code, &metadata)
            .await
            .context("Failed to upload certificate PDF")
    }

    async fn delete_blob_best_effort(&self, blob_name: &str) {
        if let Err(e) = self.ctx.blobs.delete_blob(blob_name).await {
            tracing::warn!(blob_name, error = %e, "Failed to delete certificate blob");
        }
    }

    async fn drop_archive(&self, batch: &UploadBatch) {
        if let Err(e) = self.ctx.storage.delete(&batch.blob_name).await {
            tracing::warn!(blob_name = %batch.blob_name, error = %e, "Failed to delete batch archive");
        }
    }
}

fn success_entry(
    batch_id: Uuid,
    filename: String,
    record: &ExtractedRecord,
    status: LogStatus,
    user_id: Uuid,
) -> UploadLogEntry {
    let mut entry = UploadLogEntry::new(batch_id, filename, status).with_extracted(record);
    entry.matched_user_id = Some(user_id);
    entry
}

/// `{ECM}-{YYYYMMDD}-{8 hex}`
fn new_certificate_number(standard_code: &str, date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        standard_code.to_uppercase(),
        date.format("%Y%m%d"),
        &suffix[..8]
    )
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
