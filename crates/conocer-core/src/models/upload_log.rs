use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::extracted::ExtractedRecord;

/// Final outcome of one file in a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Matched,
    Replaced,
    Skipped,
    Discarded,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Matched => "matched",
            LogStatus::Replaced => "replaced",
            LogStatus::Skipped => "skipped",
            LogStatus::Discarded => "discarded",
            LogStatus::Error => "error",
        }
    }
}

impl Display for LogStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matched" => Ok(LogStatus::Matched),
            "replaced" => Ok(LogStatus::Replaced),
            "skipped" => Ok(LogStatus::Skipped),
            "discarded" => Ok(LogStatus::Discarded),
            "error" => Ok(LogStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid log status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    NotPdf,
    ParseError,
    NoCurp,
    NoEcmCode,
    DuplicateInBatch,
    CurpNotFound,
    EcmNotFound,
    NoPendingTramite,
    ProcessingError,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::NotPdf => "not_pdf",
            DiscardReason::ParseError => "parse_error",
            DiscardReason::NoCurp => "no_curp",
            DiscardReason::NoEcmCode => "no_ecm_code",
            DiscardReason::DuplicateInBatch => "duplicate_in_batch",
            DiscardReason::CurpNotFound => "curp_not_found",
            DiscardReason::EcmNotFound => "ecm_not_found",
            DiscardReason::NoPendingTramite => "no_pending_tramite",
            DiscardReason::ProcessingError => "processing_error",
        }
    }
}

impl Display for DiscardReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscardReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_pdf" => Ok(DiscardReason::NotPdf),
            "parse_error" => Ok(DiscardReason::ParseError),
            "no_curp" => Ok(DiscardReason::NoCurp),
            "no_ecm_code" => Ok(DiscardReason::NoEcmCode),
            "duplicate_in_batch" => Ok(DiscardReason::DuplicateInBatch),
            "curp_not_found" => Ok(DiscardReason::CurpNotFound),
            "ecm_not_found" => Ok(DiscardReason::EcmNotFound),
            "no_pending_tramite" => Ok(DiscardReason::NoPendingTramite),
            "processing_error" => Ok(DiscardReason::ProcessingError),
            _ => Err(anyhow::anyhow!("Invalid discard reason: {}", s)),
        }
    }
}

/// An audit row about to be appended for one ZIP entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadLogEntry {
    pub batch_id: Uuid,
    pub filename: String,
    pub curp: Option<String>,
    pub ecm_code: Option<String>,
    pub name: Option<String>,
    pub folio: Option<String>,
    pub ecm_name: Option<String>,
    pub issue_date_text: Option<String>,
    pub certifying_entity: Option<String>,
    pub status: LogStatus,
    pub discard_reason: Option<DiscardReason>,
    pub discard_detail: Option<String>,
    pub matched_user_id: Option<Uuid>,
    pub certificate_id: Option<Uuid>,
    pub replaced_previous_hash: Option<String>,
    pub processing_time_ms: Option<i64>,
}

impl UploadLogEntry {
    pub fn new(batch_id: Uuid, filename: impl Into<String>, status: LogStatus) -> Self {
        Self {
            batch_id,
            filename: filename.into(),
            curp: None,
            ecm_code: None,
            name: None,
            folio: None,
            ecm_name: None,
            issue_date_text: None,
            certifying_entity: None,
            status,
            discard_reason: None,
            discard_detail: None,
            matched_user_id: None,
            certificate_id: None,
            replaced_previous_hash: None,
            processing_time_ms: None,
        }
    }

    /// A `discarded` row with its reason.
    pub fn discarded(batch_id: Uuid, filename: impl Into<String>, reason: DiscardReason) -> Self {
        Self::new(batch_id, filename, LogStatus::Discarded).with_reason(reason)
    }

    pub fn with_reason(mut self, reason: DiscardReason) -> Self {
        self.discard_reason = Some(reason);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.discard_detail = Some(detail.into());
        self
    }

    /// Copy every extracted field onto the row.
    pub fn with_extracted(mut self, record: &ExtractedRecord) -> Self {
        self.curp = record.curp.clone();
        self.ecm_code = record.ecm_code.clone();
        self.name = record.name.clone();
        self.folio = record.folio.clone();
        self.ecm_name = record.ecm_name.clone();
        self.issue_date_text = record.issue_date_text.clone();
        self.certifying_entity = record.certifying_entity.clone();
        self
    }
}

/// A persisted audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLog {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: UploadLogEntry,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for UploadLog {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let status = row.try_get::<String, _>("status")?.parse().map_err(|e| {
            sqlx::Error::Decode(format!("Failed to parse log status: {}", e).into())
        })?;
        let discard_reason = row
            .try_get::<Option<String>, _>("discard_reason")?
            .map(|s| s.parse::<DiscardReason>())
            .transpose()
            .map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse discard reason: {}", e).into())
            })?;

        Ok(UploadLog {
            id: row.try_get("id")?,
            entry: UploadLogEntry {
                batch_id: row.try_get("batch_id")?,
                filename: row.try_get("filename")?,
                curp: row.try_get("curp")?,
                ecm_code: row.try_get("ecm_code")?,
                name: row.try_get("name")?,
                folio: row.try_get("folio")?,
                ecm_name: row.try_get("ecm_name")?,
                issue_date_text: row.try_get("issue_date_text")?,
                certifying_entity: row.try_get("certifying_entity")?,
                status,
                discard_reason,
                discard_detail: row.try_get("discard_detail")?,
                matched_user_id: row.try_get("matched_user_id")?,
                certificate_id: row.try_get("certificate_id")?,
                replaced_previous_hash: row.try_get("replaced_previous_hash")?,
                processing_time_ms: row.try_get("processing_time_ms")?,
            },
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_reason_wire_names() {
        assert_eq!(DiscardReason::NoPendingTramite.as_str(), "no_pending_tramite");
        assert_eq!(
            "duplicate_in_batch".parse::<DiscardReason>().unwrap(),
            DiscardReason::DuplicateInBatch
        );
        assert!("unknown".parse::<DiscardReason>().is_err());
        assert_eq!(
            serde_json::to_value(DiscardReason::EcmNotFound).unwrap(),
            serde_json::json!("ecm_not_found")
        );
    }

    #[test]
    fn test_with_extracted_copies_fields() {
        let record = ExtractedRecord {
            curp: Some("GOMC850101HDFRRR09".to_string()),
            ecm_code: Some("ECM0217".to_string()),
            folio: Some("D-0000012345".to_string()),
            ..Default::default()
        };
        let entry = UploadLogEntry::discarded(Uuid::nil(), "a.pdf", DiscardReason::CurpNotFound)
            .with_extracted(&record);
        assert_eq!(entry.status, LogStatus::Discarded);
        assert_eq!(entry.curp.as_deref(), Some("GOMC850101HDFRRR09"));
        assert_eq!(entry.folio.as_deref(), Some("D-0000012345"));
        assert_eq!(entry.discard_reason, Some(DiscardReason::CurpNotFound));
        assert!(entry.name.is_none());
    }
}
