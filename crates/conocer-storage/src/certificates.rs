//! Certificate blob adapter
//!
//! Thin layer over [`Storage`] that names, hashes and tags certificate PDFs.

use crate::keys::certificate_key;
use crate::traits::{BlobMetadata, Storage, StorageError, StorageResult};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Where a certificate PDF landed and what was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCertificate {
    pub blob_name: String,
    /// Lowercase hex SHA-256 of the stored bytes
    pub content_hash: String,
    pub size_bytes: i64,
}

/// Existence and size of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobStatus {
    pub blob_name: String,
    pub exists: bool,
    pub size_bytes: Option<u64>,
}

/// SHA-256 of `data` as lowercase hex.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Clone)]
pub struct CertificateBlobStore {
    storage: Arc<dyn Storage>,
}

impl CertificateBlobStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store a certificate PDF under the user/standard prefix.
    #[tracing::instrument(skip(self, data, metadata), fields(size_bytes = data.len()))]
    pub async fn upload_certificate(
        &self,
        data: Vec<u8>,
        user_id: Uuid,
        certificate_number: &str,
        standard_code: &str,
        metadata: &BlobMetadata,
    ) -> StorageResult<StoredCertificate> {
        let hash = content_hash(&data);
        let blob_name = certificate_key(user_id, standard_code, certificate_number, &hash);
        let size_bytes = i64::try_from(data.len())
            .map_err(|_| StorageError::UploadFailed("certificate too large".to_string()))?;

        self.storage
            .upload_with_metadata(&blob_name, data, PDF_CONTENT_TYPE, metadata)
            .await?;

        Ok(StoredCertificate {
            blob_name,
            content_hash: hash,
            size_bytes,
        })
    }

    pub async fn download_certificate(&self, blob_name: &str) -> StorageResult<Vec<u8>> {
        self.storage.download(blob_name).await
    }

    pub async fn get_blob_status(&self, blob_name: &str) -> StorageResult<BlobStatus> {
        if !self.storage.exists(blob_name).await? {
            return Ok(BlobStatus {
                blob_name: blob_name.to_string(),
                exists: false,
                size_bytes: None,
            });
        }

        let size_bytes = match self.storage.content_length(blob_name).await {
            Ok(size) => Some(size),
            // Deleted between the two calls
            Err(StorageError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(BlobStatus {
            blob_name: blob_name.to_string(),
            exists: size_bytes.is_some(),
            size_bytes,
        })
    }

    pub async fn delete_blob(&self, blob_name: &str) -> StorageResult<()> {
        self.storage.delete(blob_name).await
    }
}
