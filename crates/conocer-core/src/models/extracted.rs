use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Fields read from the first page of a certificate PDF.
///
/// Every field is independently optional. When `parse_error` is set the
/// remaining fields are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub curp: Option<String>,
    pub ecm_code: Option<String>,
    pub name: Option<String>,
    pub folio: Option<String>,
    pub ecm_name: Option<String>,
    pub issue_date_text: Option<String>,
    pub certifying_entity: Option<String>,
    pub parse_error: Option<String>,
}

impl ExtractedRecord {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            parse_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Dedup key, present only when both CURP and ECM code were found.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        match (&self.curp, &self.ecm_code) {
            (Some(curp), Some(ecm)) => Some(IdentityKey::new(curp, ecm)),
            _ => None,
        }
    }
}

/// `(CURP, ECM code)` upper-cased; one certificate per key per batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub curp: String,
    pub ecm_code: String,
}

impl IdentityKey {
    pub fn new(curp: &str, ecm_code: &str) -> Self {
        Self {
            curp: curp.trim().to_uppercase(),
            ecm_code: ecm_code.trim().to_uppercase(),
        }
    }
}

impl Display for IdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.curp, self.ecm_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_is_case_insensitive() {
        let a = IdentityKey::new("gomc850101hdfrrr09", "ecm0217");
        let b = IdentityKey::new("GOMC850101HDFRRR09", "ECM0217");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "GOMC850101HDFRRR09/ECM0217");
    }

    #[test]
    fn test_identity_key_requires_both_fields() {
        let mut record = ExtractedRecord {
            curp: Some("GOMC850101HDFRRR09".to_string()),
            ..Default::default()
        };
        assert!(record.identity_key().is_none());
        record.ecm_code = Some("ECM0217".to_string());
        assert!(record.identity_key().is_some());
    }
}
