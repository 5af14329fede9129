//! In-memory certification catalog

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use conocer_core::models::{
    CandidateUser, CertificateRecord, CertificateStatus, CompetencyStandard,
};
use conocer_db::{CertificateCatalog, CertificateUnitOfWork, CertificateWrite, CommittedCertificate};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::mock_ledger::MockLedger;
use super::fixtures::{sample_standard, sample_user};

/// Mock catalog. `commit` writes the log row and batch snapshot into the
/// shared [`MockLedger`], and rejects a second active certificate per
/// `(user, standard)` like the partial unique index does.
#[derive(Clone, Default)]
#[allow(clippy::type_complexity)]
pub struct MockCatalog {
    ledger: MockLedger,
    users: Arc<Mutex<Vec<CandidateUser>>>,
    standards: Arc<Mutex<Vec<CompetencyStandard>>>,
    certificates: Arc<Mutex<HashMap<Uuid, CertificateRecord>>>,
    tramites: Arc<Mutex<HashSet<(Uuid, Uuid)>>>,
    delivered: Arc<Mutex<Vec<(Uuid, Uuid)>>>,
    failing_curps: Arc<Mutex<HashSet<String>>>,
    failing_tramites: Arc<Mutex<HashSet<Uuid>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: MockLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    pub fn add_user(&self, curp: &str) -> CandidateUser {
        let user = sample_user(curp);
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_standard(&self, code: &str, name: &str) -> CompetencyStandard {
        let standard = CompetencyStandard {
            name: name.to_string(),
            ..sample_standard(code)
        };
        self.standards.lock().unwrap().push(standard.clone());
        standard
    }

    /// The standard with `code`, created with the fixture name if missing.
    pub fn standard(&self, code: &str) -> CompetencyStandard {
        let existing = self
            .standards
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
            .cloned();
        existing.unwrap_or_else(|| {
            let standard = sample_standard(code);
            self.standards.lock().unwrap().push(standard.clone());
            standard
        })
    }

    pub fn add_tramite(&self, user_id: Uuid, standard_id: Uuid) {
        self.tramites.lock().unwrap().insert((user_id, standard_id));
    }

    pub fn add_certificate(&self, certificate: CertificateRecord) {
        self.certificates
            .lock()
            .unwrap()
            .insert(certificate.id, certificate);
    }

    /// Make `commit` fail for the candidate with `curp`.
    pub fn fail_commits_for(&self, curp: &str) {
        self.failing_curps.lock().unwrap().insert(curp.to_uppercase());
    }

    /// Make the tramite status update fail for `user_id`.
    pub fn fail_tramite_updates_for(&self, user_id: Uuid) {
        self.failing_tramites.lock().unwrap().insert(user_id);
    }

    pub fn certificate(&self, id: Uuid) -> Option<CertificateRecord> {
        self.certificates.lock().unwrap().get(&id).cloned()
    }

    pub fn certificates(&self) -> Vec<CertificateRecord> {
        let mut certificates: Vec<_> = self.certificates.lock().unwrap().values().cloned().collect();
        certificates.sort_by_key(|c| c.created_at);
        certificates
    }

    /// `(user_id, standard_id)` pairs whose tramite was marked delivered
    pub fn delivered(&self) -> Vec<(Uuid, Uuid)> {
        self.delivered.lock().unwrap().clone()
    }

    fn curp_of(&self, user_id: Uuid) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.curp.clone())
    }
}

#[async_trait]
impl CertificateCatalog for MockCatalog {
    async fn find_user_by_curp(&self, curp: &str) -> Result<Option<CandidateUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.curp.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(curp)))
            .cloned())
    }

    async fn find_standard_by_code(&self, code: &str) -> Result<Option<CompetencyStandard>> {
        Ok(self
            .standards
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn find_active_certificate(
        &self,
        user_id: Uuid,
        ecm_code: &str,
    ) -> Result<Option<CertificateRecord>> {
        Ok(self
            .certificates
            .lock()
            .unwrap()
            .values()
            .find(|c| {
                c.user_id == user_id
                    && c.ecm_code.eq_ignore_ascii_case(ecm_code)
                    && c.status == CertificateStatus::Active
            })
            .cloned())
    }

    async fn has_pending_tramite(&self, user_id: Uuid, standard_id: Uuid) -> Result<bool> {
        Ok(self.tramites.lock().unwrap().contains(&(user_id, standard_id)))
    }

    async fn folio_in_use(&self, folio: &str, excluding: Option<Uuid>) -> Result<bool> {
        Ok(self
            .certificates
            .lock()
            .unwrap()
            .values()
            .any(|c| c.folio.as_deref() == Some(folio) && Some(c.id) != excluding))
    }

    async fn commit(&self, unit: CertificateUnitOfWork) -> Result<CommittedCertificate> {
        let CertificateUnitOfWork {
            write,
            mut log,
            batch,
            user_id,
            standard_id,
        } = unit;

        if let Some(curp) = self.curp_of(user_id) {
            if self.failing_curps.lock().unwrap().contains(&curp.to_uppercase()) {
                anyhow::bail!("deadlock detected");
            }
        }

        let now = Utc::now();
        let certificate = {
            let mut certificates = self.certificates.lock().unwrap();
            match write {
                CertificateWrite::Create(new) => {
                    let duplicate = certificates.values().any(|c| {
                        c.user_id == new.user_id
                            && c.ecm_code.eq_ignore_ascii_case(&new.ecm_code)
                            && c.status == CertificateStatus::Active
                    });
                    if duplicate {
                        anyhow::bail!(
                            "duplicate key value violates unique constraint \"idx_certificates_one_active_per_standard\""
                        );
                    }
                    let record = CertificateRecord {
                        id: Uuid::new_v4(),
                        user_id: new.user_id,
                        standard_id: new.standard_id,
                        ecm_code: new.ecm_code,
                        certificate_number: new.certificate_number,
                        folio: new.folio,
                        issue_date: new.issue_date,
                        standard_name: new.standard_name,
                        certifying_entity: new.certifying_entity,
                        blob_name: new.blob_name,
                        content_hash: new.content_hash,
                        size_bytes: new.size_bytes,
                        storage_tier: new.storage_tier,
                        status: CertificateStatus::Active,
                        created_at: now,
                        updated_at: now,
                    };
                    certificates.insert(record.id, record.clone());
                    record
                }
                CertificateWrite::Replace {
                    certificate_id,
                    update,
                } => {
                    let Some(record) = certificates.get_mut(&certificate_id) else {
                        anyhow::bail!("certificate {} no longer exists", certificate_id);
                    };
                    record.blob_name = update.blob_name;
                    record.content_hash = update.content_hash;
                    record.size_bytes = update.size_bytes;
                    record.storage_tier = update.storage_tier;
                    if let Some(folio) = update.folio {
                        record.folio = Some(folio);
                    }
                    if let Some(issue_date) = update.issue_date {
                        record.issue_date = issue_date;
                    }
                    if let Some(name) = update.standard_name {
                        record.standard_name = Some(name);
                    }
                    if let Some(entity) = update.certifying_entity {
                        record.certifying_entity = Some(entity);
                    }
                    record.updated_at = now;
                    record.clone()
                }
            }
        };

        log.certificate_id = Some(certificate.id);
        self.ledger.store(&batch, &log);

        // A failed tramite update rolls back only its savepoint
        let assignment_updated = self.tramites.lock().unwrap().contains(&(user_id, standard_id))
            && !self.failing_tramites.lock().unwrap().contains(&user_id);
        if assignment_updated {
            self.delivered.lock().unwrap().push((user_id, standard_id));
        }

        Ok(CommittedCertificate {
            certificate,
            assignment_updated,
        })
    }
}
