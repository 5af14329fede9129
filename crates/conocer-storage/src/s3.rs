//! S3 backend on `object_store`. Works against AWS and S3-compatible endpoints.

use crate::traits::{BlobMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::borrow::Cow;
use std::time::Instant;

#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Credentials come from the usual `AWS_*` environment variables.
    /// `endpoint_url` selects an S3-compatible provider (e.g. MinIO); plain
    /// `http://` is only allowed there.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());
        if let Some(endpoint) = endpoint_url {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        Ok(Self { store, bucket })
    }

    async fn put(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        attributes: Attributes,
    ) -> StorageResult<()> {
        let size = data.len();
        let started = Instant::now();
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let payload = PutPayload::from(Bytes::from(data));
        if let Err(e) = self
            .store
            .put_opts(&Path::from(storage_key), payload, options)
            .await
        {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                "S3 upload failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = started.elapsed().as_millis() as u64,
            "Blob written"
        );
        Ok(())
    }

    fn missing_or(
        &self,
        storage_key: &str,
        err: ObjectStoreError,
        wrap: fn(String) -> StorageError,
    ) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 request failed"
                );
                wrap(other.to_string())
            }
        }
    }
}

/// `Content-Type` plus one `x-amz-meta-*` attribute per metadata entry.
fn put_attributes(content_type: &str, metadata: Option<&BlobMetadata>) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from(content_type.to_string()),
    );
    for (key, value) in metadata.into_iter().flatten() {
        attributes.insert(
            Attribute::Metadata(Cow::Owned(key.clone())),
            AttributeValue::from(value.clone()),
        );
    }
    attributes
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.put(storage_key, data, put_attributes(content_type, None))
            .await
    }

    async fn upload_with_metadata(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> StorageResult<()> {
        self.put(storage_key, data, put_attributes(content_type, Some(metadata)))
            .await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let object = self
            .store
            .get(&Path::from(storage_key))
            .await
            .map_err(|e| self.missing_or(storage_key, e, StorageError::DownloadFailed))?;
        let bytes = object
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        match self.store.delete(&Path::from(storage_key)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %storage_key, "Blob deleted");
                Ok(())
            }
            Err(e) => Err(self.missing_or(storage_key, e, StorageError::DeleteFailed)),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self.store.head(&Path::from(storage_key)).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let meta = self
            .store
            .head(&Path::from(storage_key))
            .await
            .map_err(|e| self.missing_or(storage_key, e, StorageError::BackendError))?;
        Ok(meta.size as u64)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
