use chrono::{DateTime, Utc};
use filestore_core::{DeploymentSettings, FilePatch, FileRecord, LogicalStore, MigrationResult, StoreLabel};

/// Records to enumerate for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Only records currently stored under this label.
    pub label: StoreLabel,
    /// Resume offset: records uploaded before it are excluded.
    pub uploaded_since: Option<DateTime<Utc>>,
}

impl FileQuery {
    pub fn store(&self) -> LogicalStore {
        self.label.store
    }
}

/// Access to the platform's file metadata.
///
/// The migrator never talks to the database directly; tests substitute an
/// in-memory implementation.
#[async_trait::async_trait]
pub trait FileCatalog: Send + Sync {
    /// Deployment unique ID and site URL.
    async fn settings(&self) -> MigrationResult<DeploymentSettings>;

    /// Matching records, newest first.
    async fn find_files(&self, query: &FileQuery) -> MigrationResult<Vec<FileRecord>>;

    /// Apply a patch to the record with `file_id`.
    async fn apply_patch(
        &self,
        store: LogicalStore,
        file_id: &str,
        patch: &FilePatch,
    ) -> MigrationResult<()>;
}
