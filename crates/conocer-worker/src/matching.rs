//! Pass 2 lookups and the decision table.

use anyhow::{Context, Result};
use conocer_core::models::{
    CandidateUser, CertificateRecord, CompetencyStandard, DiscardReason, IdentityKey,
};
use conocer_db::CertificateCatalog;

/// What the catalog knows about one winner's identity key.
///
/// Lookups stop at the first miss, so later fields stay empty when `user`
/// or `standard` is `None`.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub user: Option<CandidateUser>,
    pub standard: Option<CompetencyStandard>,
    pub has_pending_tramite: bool,
    pub existing: Option<CertificateRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    Discard(DiscardReason),
    Create,
    Replace(CertificateRecord),
}

impl MatchResult {
    pub async fn lookup(catalog: &dyn CertificateCatalog, key: &IdentityKey) -> Result<Self> {
        let mut result = Self::default();

        let Some(user) = catalog
            .find_user_by_curp(&key.curp)
            .await
            .context("Failed to look up candidate by CURP")?
        else {
            return Ok(result);
        };

        let Some(standard) = catalog
            .find_standard_by_code(&key.ecm_code)
            .await
            .context("Failed to look up competency standard")?
        else {
            result.user = Some(user);
            return Ok(result);
        };

        result.has_pending_tramite = catalog
            .has_pending_tramite(user.id, standard.id)
            .await
            .context("Failed to check pending tramite")?;
        result.existing = catalog
            .find_active_certificate(user.id, &standard.code)
            .await
            .context("Failed to look up active certificate")?;
        result.user = Some(user);
        result.standard = Some(standard);

        Ok(result)
    }

    /// An existing active certificate is always replaced, even without a
    /// pending tramite.
    pub fn decision(&self) -> MatchDecision {
        if self.user.is_none() {
            return MatchDecision::Discard(DiscardReason::CurpNotFound);
        }
        if self.standard.is_none() {
            return MatchDecision::Discard(DiscardReason::EcmNotFound);
        }
        match (&self.existing, self.has_pending_tramite) {
            (Some(existing), _) => MatchDecision::Replace(existing.clone()),
            (None, true) => MatchDecision::Create,
            (None, false) => MatchDecision::Discard(DiscardReason::NoPendingTramite),
        }
    }
}
