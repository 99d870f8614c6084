use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use filestore_core::{
    DeploymentSettings, FilePatch, FileRecord, LogicalStore, MigrationError, MigrationPhase,
    MigrationResult, ObjectLocation,
};
use filestore_db::{FileCatalog, FileQuery};

/// Apply `patch` to `record` the way the `$set`/`$unset` update changes the document.
pub fn apply_patch(record: &mut FileRecord, patch: &FilePatch) {
    if let Some(field) = record.location.field() {
        if patch.unset.contains(&field) {
            record.location = ObjectLocation::ById;
        }
    }
    if patch.location != ObjectLocation::ById {
        record.location = patch.location.clone();
    }
    record.url = patch.url.clone();
    record.path = patch.path.clone();
    record.store = patch.store.clone();
}

/// Catalog holding records in memory and applying patches the way the database does.
pub struct InMemoryCatalog {
    settings: DeploymentSettings,
    records: Mutex<Vec<(LogicalStore, FileRecord)>>,
    fail_patch_for: Mutex<Option<String>>,
    pub settings_calls: AtomicUsize,
    pub patches: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new(settings: DeploymentSettings) -> Self {
        Self {
            settings,
            records: Mutex::new(Vec::new()),
            fail_patch_for: Mutex::new(None),
            settings_calls: AtomicUsize::new(0),
            patches: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, store: LogicalStore, record: FileRecord) {
        self.records.lock().unwrap().push((store, record));
    }

    pub fn get(&self, store: LogicalStore, id: &str) -> Option<FileRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|(s, r)| *s == store && r.id == id)
            .map(|(_, r)| r.clone())
    }

    pub fn fail_patch(&self, id: &str) {
        *self.fail_patch_for.lock().unwrap() = Some(id.to_string());
    }

    pub fn settings_call_count(&self) -> usize {
        self.settings_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileCatalog for InMemoryCatalog {
    async fn settings(&self) -> MigrationResult<DeploymentSettings> {
        self.settings_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.clone())
    }

    async fn find_files(&self, query: &FileQuery) -> MigrationResult<Vec<FileRecord>> {
        let label = query.label.to_string();
        let mut files: Vec<FileRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(store, record)| {
                *store == query.store()
                    && record.store == label
                    && match (query.uploaded_since, record.uploaded_at) {
                        (Some(since), Some(at)) => at >= since,
                        (Some(_), None) => false,
                        (None, _) => true,
                    }
            })
            .map(|(_, record)| record.clone())
            .collect();

        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    async fn apply_patch(
        &self,
        store: LogicalStore,
        file_id: &str,
        patch: &FilePatch,
    ) -> MigrationResult<()> {
        if self.fail_patch_for.lock().unwrap().as_deref() == Some(file_id) {
            return Err(MigrationError::Catalog {
                phase: MigrationPhase::Persist,
                message: "write concern error".to_string(),
            });
        }

        let mut records = self.records.lock().unwrap();
        let (_, record) = records
            .iter_mut()
            .find(|(s, r)| *s == store && r.id == file_id)
            .ok_or_else(|| MigrationError::Catalog {
                phase: MigrationPhase::Persist,
                message: format!("File record {} no longer exists", file_id),
            })?;

        apply_patch(record, patch);
        self.patches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
