use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because configuration selects the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// Access tier recorded for a certificate blob.
///
/// New certificates start on `Cool`; tier transitions are owned by the blob
/// store's lifecycle policy, not by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobTier {
    Hot,
    #[default]
    Cool,
    Archive,
}

impl BlobTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobTier::Hot => "hot",
            BlobTier::Cool => "cool",
            BlobTier::Archive => "archive",
        }
    }
}

impl FromStr for BlobTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(BlobTier::Hot),
            "cool" => Ok(BlobTier::Cool),
            "archive" => Ok(BlobTier::Archive),
            _ => Err(anyhow::anyhow!("Invalid blob tier: {}", s)),
        }
    }
}

impl Display for BlobTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
