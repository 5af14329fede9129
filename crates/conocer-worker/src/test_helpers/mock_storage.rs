//! Mock Storage implementation for testing

use async_trait::async_trait;
use conocer_storage::{BlobMetadata, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock storage implementation that stores files in memory
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    metadata: Arc<Mutex<HashMap<String, BlobMetadata>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file(&self, key: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn remove_file(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Make `delete` of `key` fail and leave the file in place.
    pub fn fail_delete_for(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Metadata sent with the last upload of `key`
    pub fn metadata(&self, key: &str) -> Option<BlobMetadata> {
        self.metadata.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        self.set_file(storage_key, data);
        Ok(())
    }

    async fn upload_with_metadata(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> StorageResult<()> {
        self.metadata
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), metadata.clone());
        self.upload_with_key(storage_key, data, content_type).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.get_file(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(storage_key) {
            return Err(StorageError::DeleteFailed(format!(
                "access denied: {}",
                storage_key
            )));
        }
        self.remove_file(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.has_file(storage_key))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        self.get_file(storage_key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
