use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::storage_types::BlobTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Active,
    Revoked,
    Superseded,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Revoked => "revoked",
            CertificateStatus::Superseded => "superseded",
        }
    }
}

impl Display for CertificateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CertificateStatus::Active),
            "revoked" => Ok(CertificateStatus::Revoked),
            "superseded" => Ok(CertificateStatus::Superseded),
            _ => Err(anyhow::anyhow!("Invalid certificate status: {}", s)),
        }
    }
}

/// A persisted CONOCER certificate and the blob holding its PDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub standard_id: Uuid,
    pub ecm_code: String,
    pub certificate_number: String,
    pub folio: Option<String>,
    pub issue_date: NaiveDate,
    pub standard_name: Option<String>,
    pub certifying_entity: Option<String>,
    pub blob_name: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub storage_tier: BlobTier,
    pub status: CertificateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for CertificateRecord {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(CertificateRecord {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            standard_id: row.try_get("standard_id")?,
            ecm_code: row.try_get("ecm_code")?,
            certificate_number: row.try_get("certificate_number")?,
            folio: row.try_get("folio")?,
            issue_date: row.try_get("issue_date")?,
            standard_name: row.try_get("standard_name")?,
            certifying_entity: row.try_get("certifying_entity")?,
            blob_name: row.try_get("blob_name")?,
            content_hash: row.try_get("content_hash")?,
            size_bytes: row.try_get("size_bytes")?,
            storage_tier: row.try_get::<String, _>("storage_tier")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse storage_tier: {}", e).into())
            })?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse certificate status: {}", e).into())
            })?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert payload for a brand-new certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCertificate {
    pub user_id: Uuid,
    pub standard_id: Uuid,
    pub ecm_code: String,
    pub certificate_number: String,
    pub folio: Option<String>,
    pub issue_date: NaiveDate,
    pub standard_name: Option<String>,
    pub certifying_entity: Option<String>,
    pub blob_name: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub storage_tier: BlobTier,
}

/// Replacement of an existing certificate's blob and metadata.
///
/// Blob fields are always overwritten; `None` metadata fields keep the
/// stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateUpdate {
    pub blob_name: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub storage_tier: BlobTier,
    pub folio: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub standard_name: Option<String>,
    pub certifying_entity: Option<String>,
}
