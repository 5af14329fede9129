//! Certification catalog repository.
//!
//! Reads candidates, standards and eligibility; writes certificates and the
//! assignment tramite status. The catalog tables are owned by the
//! certification service; only the columns used here are assumed.

use anyhow::Context;
use conocer_core::models::{
    CandidateUser, CertificateRecord, CertificateStatus, CertificateUpdate, CompetencyStandard,
    NewCertificate, TramiteStatus,
};
use conocer_core::AppError;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use super::batch::{insert_log, update_batch};
use super::transaction::best_effort_savepoint;
use crate::traits::{CertificateUnitOfWork, CertificateWrite, CommittedCertificate};

const CERTIFICATE_COLUMNS: &str = r#"
    id, user_id, standard_id, ecm_code, certificate_number, folio, issue_date,
    standard_name, certifying_entity, blob_name, content_hash, size_bytes,
    storage_tier, status, created_at, updated_at
"#;

/// Minimum CURP length for a candidate to be eligible for a certificate.
const MIN_ELIGIBLE_CURP_LEN: i32 = 10;

#[derive(Clone)]
pub struct CertificateRepository {
    pool: PgPool,
}

impl CertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users"))]
    pub async fn find_user_by_curp(&self, curp: &str) -> Result<Option<CandidateUser>, AppError> {
        let user = sqlx::query_as::<Postgres, CandidateUser>(
            r#"
            SELECT id, curp, full_name
            FROM users
            WHERE upper(curp) = upper($1)
            LIMIT 1
            "#,
        )
        .bind(curp.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "competency_standards"))]
    pub async fn find_standard_by_code(
        &self,
        code: &str,
    ) -> Result<Option<CompetencyStandard>, AppError> {
        let standard = sqlx::query_as::<Postgres, CompetencyStandard>(
            r#"
            SELECT id, code, name
            FROM competency_standards
            WHERE upper(code) = upper($1)
            LIMIT 1
            "#,
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(standard)
    }

    #[tracing::instrument(skip(self), fields(db.table = "certificates", user_id = %user_id))]
    pub async fn find_active_certificate(
        &self,
        user_id: Uuid,
        ecm_code: &str,
    ) -> Result<Option<CertificateRecord>, AppError> {
        let certificate = sqlx::query_as::<Postgres, CertificateRecord>(&format!(
            r#"
            SELECT {}
            FROM certificates
            WHERE user_id = $1 AND upper(ecm_code) = upper($2) AND status = 'active'
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
            CERTIFICATE_COLUMNS
        ))
        .bind(user_id)
        .bind(ecm_code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    /// A candidate has a pending tramite for a standard when all hold:
    /// a completed, passed result for an exam linked to the standard; an
    /// active membership in an active group with the advanced certification
    /// tier enabled (group override first, then the campus setting); that
    /// exam assigned to the group; and a CURP of at least 10 characters.
    #[tracing::instrument(skip(self), fields(db.table = "exam_results", user_id = %user_id, standard_id = %standard_id))]
    pub async fn has_pending_tramite(
        &self,
        user_id: Uuid,
        standard_id: Uuid,
    ) -> Result<bool, AppError> {
        let pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users u
                JOIN exam_results er
                  ON er.user_id = u.id
                 AND er.status = 'completed'
                 AND er.passed = TRUE
                JOIN exams e
                  ON e.id = er.exam_id
                 AND e.competency_standard_id = $2
                JOIN group_members gm
                  ON gm.user_id = u.id
                 AND gm.status = 'active'
                JOIN candidate_groups g
                  ON g.id = gm.group_id
                 AND g.is_active = TRUE
                LEFT JOIN campuses c
                  ON c.id = g.campus_id
                JOIN group_exams ge
                  ON ge.group_id = g.id
                 AND ge.exam_id = e.id
                WHERE u.id = $1
                  AND char_length(COALESCE(u.curp, '')) >= $3
                  AND COALESCE(g.advanced_tier_enabled, c.advanced_tier_enabled, FALSE) = TRUE
            )
            "#,
        )
        .bind(user_id)
        .bind(standard_id)
        .bind(MIN_ELIGIBLE_CURP_LEN)
        .fetch_one(&self.pool)
        .await?;

        Ok(pending)
    }

    #[tracing::instrument(skip(self), fields(db.table = "certificates"))]
    pub async fn folio_in_use(&self, folio: &str, excluding: Option<Uuid>) -> Result<bool, AppError> {
        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM certificates
                WHERE folio = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(folio)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(in_use)
    }

    #[tracing::instrument(skip(self, new), fields(db.table = "certificates", user_id = %new.user_id))]
    pub async fn create_certificate(
        &self,
        new: &NewCertificate,
    ) -> Result<CertificateRecord, AppError> {
        Ok(insert_certificate(&self.pool, new).await?)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "certificates", db.record_id = %certificate_id))]
    pub async fn update_certificate(
        &self,
        certificate_id: Uuid,
        update: &CertificateUpdate,
    ) -> Result<CertificateRecord, AppError> {
        update_certificate_row(&self.pool, certificate_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("certificate {}", certificate_id)))
    }

    /// Returns the number of assignments updated.
    #[tracing::instrument(skip(self), fields(db.table = "candidate_assignments", user_id = %user_id))]
    pub async fn update_assignment_tramite_status(
        &self,
        user_id: Uuid,
        standard_id: Uuid,
        status: TramiteStatus,
    ) -> Result<u64, AppError> {
        Ok(update_tramite(&self.pool, user_id, standard_id, status).await?)
    }

    /// Persist one winner: certificate write, audit row and batch counters
    /// commit together; the tramite update runs in a savepoint so its
    /// failure leaves the rest intact.
    #[tracing::instrument(skip(self, unit), fields(batch_id = %unit.batch.id, user_id = %unit.user_id))]
    pub async fn commit(&self, unit: CertificateUnitOfWork) -> anyhow::Result<CommittedCertificate> {
        let CertificateUnitOfWork {
            write,
            mut log,
            batch,
            user_id,
            standard_id,
        } = unit;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin certificate transaction")?;

        let certificate = match &write {
            CertificateWrite::Create(new) => insert_certificate(&mut *tx, new)
                .await
                .context("Failed to insert certificate")?,
            CertificateWrite::Replace {
                certificate_id,
                update,
            } => update_certificate_row(&mut *tx, *certificate_id, update)
                .await
                .context("Failed to update certificate")?
                .ok_or_else(|| anyhow::anyhow!("certificate {} no longer exists", certificate_id))?,
        };

        log.certificate_id = Some(certificate.id);
        insert_log(&mut *tx, &log)
            .await
            .context("Failed to append upload log")?;
        update_batch(&mut *tx, &batch)
            .await
            .context("Failed to update batch counters")?;

        let assignment_updated = best_effort_savepoint(&mut tx, "tramite_update", move |tx| {
            Box::pin(async move {
                update_tramite(&mut **tx, user_id, standard_id, TramiteStatus::Delivered)
                    .await
                    .map(|_| ())
            })
        })
        .await?;

        tx.commit()
            .await
            .context("Failed to commit certificate transaction")?;

        if !assignment_updated {
            tracing::warn!(
                user_id = %user_id,
                standard_id = %standard_id,
                "Certificate stored but assignment tramite status was not updated"
            );
        }

        Ok(CommittedCertificate {
            certificate,
            assignment_updated,
        })
    }
}

async fn insert_certificate<'c, E>(
    executor: E,
    new: &NewCertificate,
) -> Result<CertificateRecord, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<Postgres, CertificateRecord>(&format!(
        r#"
        INSERT INTO certificates (
            id, user_id, standard_id, ecm_code, certificate_number, folio, issue_date,
            standard_name, certifying_entity, blob_name, content_hash, size_bytes,
            storage_tier, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        CERTIFICATE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.standard_id)
    .bind(&new.ecm_code)
    .bind(&new.certificate_number)
    .bind(&new.folio)
    .bind(new.issue_date)
    .bind(&new.standard_name)
    .bind(&new.certifying_entity)
    .bind(&new.blob_name)
    .bind(&new.content_hash)
    .bind(new.size_bytes)
    .bind(new.storage_tier.as_str())
    .bind(CertificateStatus::Active.as_str())
    .fetch_one(executor)
    .await
}

async fn update_certificate_row<'c, E>(
    executor: E,
    certificate_id: Uuid,
    update: &CertificateUpdate,
) -> Result<Option<CertificateRecord>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<Postgres, CertificateRecord>(&format!(
        r#"
        UPDATE certificates
        SET blob_name = $2,
            content_hash = $3,
            size_bytes = $4,
            storage_tier = $5,
            folio = COALESCE($6, folio),
            issue_date = COALESCE($7, issue_date),
            standard_name = COALESCE($8, standard_name),
            certifying_entity = COALESCE($9, certifying_entity),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CERTIFICATE_COLUMNS
    ))
    .bind(certificate_id)
    .bind(&update.blob_name)
    .bind(&update.content_hash)
    .bind(update.size_bytes)
    .bind(update.storage_tier.as_str())
    .bind(&update.folio)
    .bind(update.issue_date)
    .bind(&update.standard_name)
    .bind(&update.certifying_entity)
    .fetch_optional(executor)
    .await
}

async fn update_tramite<'c, E>(
    executor: E,
    user_id: Uuid,
    standard_id: Uuid,
    status: TramiteStatus,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE candidate_assignments
        SET tramite_status = $3, updated_at = NOW()
        WHERE user_id = $1 AND competency_standard_id = $2
        "#,
    )
    .bind(user_id)
    .bind(standard_id)
    .bind(status.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
