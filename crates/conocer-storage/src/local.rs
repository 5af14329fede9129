//! Filesystem backend. Keys map to paths below a single root directory.

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Suffix of the scratch file a blob is written to before it is renamed into place.
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (creating if needed) the blob directory at `root`.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        let root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to resolve {}: {}", root.display(), e))
        })?;

        Ok(Self { root })
    }

    /// Map a key to a path under the root. Only plain `/`-separated name
    /// segments are accepted.
    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(storage_key);
        let plain = !storage_key.is_empty()
            && !storage_key.contains('\\')
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        let started = Instant::now();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers never observe a half-written blob
        let scratch = partial_path(&path);
        let written = match write_synced(&scratch, &data).await {
            Ok(()) => fs::rename(&scratch, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&scratch).await;
            return Err(StorageError::UploadFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Blob written"
        );
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(storage_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %storage_key, "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.resolve(storage_key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: &str = "certificates/u/ECM0217/C-1_0123456789ab.pdf";

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"%PDF-1.4 test".to_vec();
        storage
            .upload_with_key(KEY, data.clone(), "application/pdf")
            .await
            .unwrap();

        assert_eq!(storage.download(KEY).await.unwrap(), data);
        assert_eq!(
            storage.content_length(KEY).await.unwrap(),
            data.len() as u64
        );
        assert!(!partial_path(&dir.path().join(KEY)).exists());
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload_with_key(KEY, b"first".to_vec(), "application/pdf")
            .await
            .unwrap();
        storage
            .upload_with_key(KEY, b"second".to_vec(), "application/pdf")
            .await
            .unwrap();

        assert_eq!(storage.download(KEY).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_keys_outside_root_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        for key in ["../../../etc/passwd", "/etc/passwd", "a/../b", "a\\b", "./a", ""] {
            assert!(
                matches!(storage.download(key).await, Err(StorageError::InvalidKey(_))),
                "{key:?} was accepted"
            );
        }
        assert!(matches!(
            storage.delete("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_objects() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(storage.delete("nonexistent/file.pdf").await.is_ok());
        assert!(!storage.exists("nonexistent/file.pdf").await.unwrap());
        assert!(matches!(
            storage.download("nonexistent/file.pdf").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.content_length("nonexistent/file.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_upload_stores_bytes_only() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let mut metadata = crate::BlobMetadata::new();
        metadata.insert("curp".to_string(), "GOMC850101HDFRRR09".to_string());
        storage
            .upload_with_metadata("batches/b/lote.zip", b"PK".to_vec(), "application/zip", &metadata)
            .await
            .unwrap();

        assert_eq!(storage.download("batches/b/lote.zip").await.unwrap(), b"PK");
    }
}
