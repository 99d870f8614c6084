use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use filestore_core::{FileRecord, ProviderType};
use filestore_storage::{ScratchDirectory, StorageError, StorageProvider, StorageResult};

/// Failure injected for a file ID.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Io,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// State shared between a `MockProvider` and the test that owns it.
#[derive(Default)]
pub struct MockState {
    /// Source objects by file ID.
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub failures: Mutex<HashMap<String, Failure>>,
    /// Uploaded objects by key.
    pub uploads: Mutex<HashMap<String, StoredObject>>,
    pub fetches: AtomicUsize,
    pub upload_calls: AtomicUsize,
}

impl MockState {
    pub fn put_object(&self, file_id: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(file_id.to_string(), data.to_vec());
    }

    pub fn fail(&self, file_id: &str, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .insert(file_id.to_string(), failure);
    }

    pub fn uploaded(&self, key: &str) -> Option<StoredObject> {
        self.uploads.lock().unwrap().get(key).cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

/// Provider keeping its objects in memory. Downloads go through a real scratch directory.
pub struct MockProvider {
    provider_type: ProviderType,
    state: Arc<MockState>,
    scratch: Option<ScratchDirectory>,
}

impl MockProvider {
    pub fn new(provider_type: ProviderType) -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                provider_type,
                state: state.clone(),
                scratch: None,
            },
            state,
        )
    }

    pub fn boxed(provider_type: ProviderType) -> (Box<dyn StorageProvider>, Arc<MockState>) {
        let (provider, state) = Self::new(provider_type);
        (Box::new(provider), state)
    }

    async fn fetch(&self, file_id: &str, dest: PathBuf) -> StorageResult<u64> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);

        let failure = self.state.failures.lock().unwrap().get(file_id).copied();
        match failure {
            Some(Failure::NotFound) => return Err(StorageError::NotFound(file_id.to_string())),
            Some(Failure::Io) => {
                return Err(StorageError::DownloadFailed(format!(
                    "connection reset while reading {}",
                    file_id
                )))
            }
            None => {}
        }

        let data = self
            .state
            .objects
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))?;
        tokio::fs::write(&dest, &data).await?;
        Ok(data.len() as u64)
    }
}

#[async_trait::async_trait]
impl StorageProvider for MockProvider {
    fn store_type(&self) -> ProviderType {
        self.provider_type
    }

    fn set_scratch_directory(&mut self, dir: PathBuf) {
        self.scratch = Some(ScratchDirectory::new(dir));
    }

    async fn download(&self, _collection: &str, file: &FileRecord) -> StorageResult<PathBuf> {
        let scratch = self
            .scratch
            .as_ref()
            .ok_or_else(|| StorageError::ConfigError("scratch directory not set".to_string()))?;
        scratch
            .materialize(&file.id, |partial| self.fetch(&file.id, partial))
            .await
    }

    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        self.state.upload_calls.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(local_path).await?;
        self.state.uploads.lock().unwrap().insert(
            object_key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
