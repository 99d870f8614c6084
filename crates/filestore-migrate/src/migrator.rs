//! Migration orchestrator.
//!
//! A run enumerates the records currently stored under `<source>:<store>` and
//! processes them one at a time: fetch into the scratch directory, compute the
//! destination key, upload, then record the new location in the catalog. A record
//! is fully recorded before the next one starts, so an aborted run leaves at most
//! one object copied but not recorded.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use filestore_core::{
    DeploymentSettings, FileRecord, LogicalStore, MigrationError, MigrationPhase,
    MigrationResult, MigratorConfig, ProviderType, StoreLabel,
};
use filestore_db::{FileCatalog, FileQuery};
use filestore_storage::{
    resolve_object_key, ScratchDirectory, StorageError, StorageProvider,
};
use tokio::sync::OnceCell;

use crate::patch::build_patch;
use crate::summary::MigrationSummary;

/// Run settings that are not provider handles.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub logical_store: LogicalStore,
    /// Scratch files live in `<scratch_root>/<store lower>`.
    pub scratch_root: PathBuf,
    pub skip_errors: bool,
    /// Pause between records.
    pub file_delay: Duration,
    /// Records uploaded before this instant are not enumerated.
    pub file_offset: Option<DateTime<Utc>>,
    /// Source provider type for runs without a source provider (upload runs).
    pub source_type: Option<ProviderType>,
}

impl MigrationOptions {
    pub fn from_config(config: &MigratorConfig) -> Self {
        Self {
            logical_store: config.logical_store,
            scratch_root: config.scratch_root.clone(),
            skip_errors: config.skip_errors,
            file_delay: config.file_delay,
            file_offset: config.file_offset,
            source_type: config.source.as_ref().map(|s| s.provider_type()),
        }
    }
}

enum Outcome {
    Migrated,
    SkippedIncomplete,
    SkippedMissing,
}

impl MigrationSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Migrated => self.migrated += 1,
            Outcome::SkippedIncomplete => self.skipped_incomplete += 1,
            Outcome::SkippedMissing => self.skipped_missing += 1,
        }
    }
}

/// Map a provider failure to the run's error taxonomy.
fn storage_failure(phase: MigrationPhase, file_id: &str, err: StorageError) -> MigrationError {
    match err {
        StorageError::NotFound(message) => MigrationError::NotFound {
            file_id: file_id.to_string(),
            message,
        },
        StorageError::ConfigError(message) => MigrationError::Configuration(message),
        err @ StorageError::Unimplemented { .. } => MigrationError::Configuration(err.to_string()),
        other => MigrationError::TransientIo {
            phase,
            file_id: file_id.to_string(),
            message: other.to_string(),
        },
    }
}

pub struct Migrator {
    source: Option<Box<dyn StorageProvider>>,
    destination: Option<Box<dyn StorageProvider>>,
    catalog: Arc<dyn FileCatalog>,
    options: MigrationOptions,
    scratch: ScratchDirectory,
    settings: OnceCell<DeploymentSettings>,
    last_summary: Mutex<Option<MigrationSummary>>,
}

impl Migrator {
    /// Validate the targets and prepare the scratch directory.
    pub async fn new(
        mut source: Option<Box<dyn StorageProvider>>,
        destination: Option<Box<dyn StorageProvider>>,
        catalog: Arc<dyn FileCatalog>,
        mut options: MigrationOptions,
    ) -> MigrationResult<Self> {
        if source.is_none() && destination.is_none() {
            return Err(MigrationError::Configuration(
                "At least a source or destination store must be provided".to_string(),
            ));
        }

        if let Some(destination) = &destination {
            if !destination.store_type().accepts_uploads() {
                return Err(MigrationError::Configuration(format!(
                    "You cannot use {} as a destination target",
                    destination.store_type()
                )));
            }
        }

        let scratch = ScratchDirectory::new(ScratchDirectory::for_store(
            &options.scratch_root,
            options.logical_store,
        ));
        scratch
            .ensure()
            .await
            .map_err(|e| MigrationError::Configuration(e.to_string()))?;

        if let Some(source) = source.as_mut() {
            source.set_scratch_directory(scratch.path().to_path_buf());
            options.source_type = Some(source.store_type());
        }

        tracing::info!(
            store = %options.logical_store,
            source = ?options.source_type,
            destination = ?destination.as_ref().map(|d| d.store_type()),
            scratch = %scratch.path().display(),
            skip_errors = options.skip_errors,
            "Migrator initialized"
        );

        Ok(Self {
            source,
            destination,
            catalog,
            options,
            scratch,
            settings: OnceCell::new(),
            last_summary: Mutex::new(None),
        })
    }

    fn source(&self) -> MigrationResult<&dyn StorageProvider> {
        self.source.as_deref().ok_or_else(|| {
            MigrationError::Configuration("No source store configured".to_string())
        })
    }

    fn destination(&self) -> MigrationResult<&dyn StorageProvider> {
        self.destination.as_deref().ok_or_else(|| {
            MigrationError::Configuration("No destination store configured".to_string())
        })
    }

    /// Deployment settings, read from the catalog once per migrator.
    async fn settings(&self) -> MigrationResult<&DeploymentSettings> {
        self.settings
            .get_or_try_init(|| self.catalog.settings())
            .await
    }

    async fn enumerate(&self) -> MigrationResult<Vec<FileRecord>> {
        let source_type = self.options.source_type.ok_or_else(|| {
            MigrationError::Configuration(
                "A source store type is required to select records".to_string(),
            )
        })?;

        let query = FileQuery {
            label: StoreLabel::new(source_type, self.options.logical_store),
            uploaded_since: self.options.file_offset,
        };

        tracing::info!(
            label = %query.label,
            since = ?query.uploaded_since,
            "Enumerating file records"
        );

        self.catalog.find_files(&query).await
    }

    async fn pause(&self) {
        if !self.options.file_delay.is_zero() {
            tokio::time::sleep(self.options.file_delay).await;
        }
    }

    /// Apply the skip policy to a per-record failure.
    fn skip_or_abort(&self, err: MigrationError) -> MigrationResult<Outcome> {
        if self.options.skip_errors && matches!(err, MigrationError::NotFound { .. }) {
            tracing::warn!(error = %err, "Skipping file missing from the source store");
            Ok(Outcome::SkippedMissing)
        } else {
            Err(err)
        }
    }

    async fn fetch(&self, source: &dyn StorageProvider, file: &FileRecord) -> MigrationResult<PathBuf> {
        source
            .download(self.options.logical_store.collection(), file)
            .await
            .map_err(|e| storage_failure(MigrationPhase::Fetch, &file.id, e))
    }

    /// Upload a local copy of `file` and record its new location.
    async fn store_and_record(
        &self,
        destination: &dyn StorageProvider,
        settings: &DeploymentSettings,
        file: &FileRecord,
        local_path: PathBuf,
    ) -> MigrationResult<String> {
        let store = self.options.logical_store;
        let key = resolve_object_key(store, destination.key_layout(), &settings.unique_id, file);

        tracing::debug!(file_id = %file.id, key = %key, "Uploading file");
        destination
            .upload(&key, &local_path, &file.content_type)
            .await
            .map_err(|e| storage_failure(MigrationPhase::Upload, &file.id, e))?;

        let patch = build_patch(destination.store_type(), store, settings, file, &key);
        self.catalog
            .apply_patch(store, &file.id, &patch)
            .await
            .map_err(|e| MigrationError::Persistence {
                file_id: file.id.clone(),
                key: key.clone(),
                message: e.to_string(),
            })?;

        Ok(key)
    }

    async fn migrate_file(
        &self,
        source: &dyn StorageProvider,
        destination: &dyn StorageProvider,
        settings: &DeploymentSettings,
        file: &FileRecord,
    ) -> MigrationResult<Outcome> {
        if !file.complete {
            tracing::debug!(file_id = %file.id, "Skipping incomplete upload");
            return Ok(Outcome::SkippedIncomplete);
        }

        let local_path = match self.fetch(source, file).await {
            Ok(path) => path,
            Err(err) => return self.skip_or_abort(err),
        };

        let key = self
            .store_and_record(destination, settings, file, local_path)
            .await?;

        tracing::info!(
            file_id = %file.id,
            key = %key,
            size_bytes = file.size,
            "File migrated"
        );

        Ok(Outcome::Migrated)
    }

    /// Keep and log the counters of a finished or aborted run.
    fn finish(
        &self,
        operation: &'static str,
        summary: MigrationSummary,
        result: MigrationResult<()>,
    ) -> MigrationResult<MigrationSummary> {
        if let Ok(mut last) = self.last_summary.lock() {
            *last = Some(summary);
        }

        match result {
            Ok(()) => {
                summary.log(operation);
                Ok(summary)
            }
            Err(err) => {
                summary.log_aborted(operation, &err);
                Err(err)
            }
        }
    }

    /// Counters of the most recent run, including one that aborted.
    pub fn last_summary(&self) -> Option<MigrationSummary> {
        self.last_summary.lock().ok().and_then(|last| *last)
    }

    /// Copy every record of the source store to the destination and repoint the catalog.
    #[tracing::instrument(skip(self), fields(store = %self.options.logical_store))]
    pub async fn migrate_store(&self) -> MigrationResult<MigrationSummary> {
        let source = self.source()?;
        let destination = self.destination()?;
        let settings = self.settings().await?;

        let files = self.enumerate().await?;
        let mut summary = MigrationSummary {
            total: files.len(),
            ..Default::default()
        };

        let mut result = Ok(());
        for file in &files {
            let outcome = match self.migrate_file(source, destination, settings, file).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            };
            let migrated = matches!(outcome, Outcome::Migrated);
            summary.record(outcome);
            if migrated {
                self.pause().await;
            }
        }

        self.finish("migrate", summary, result)
    }

    /// Fetch every record of the source store into the scratch directory.
    #[tracing::instrument(skip(self), fields(store = %self.options.logical_store))]
    pub async fn download_all(&self) -> MigrationResult<MigrationSummary> {
        let source = self.source()?;

        let files = self.enumerate().await?;
        let mut summary = MigrationSummary {
            total: files.len(),
            ..Default::default()
        };

        let mut result = Ok(());
        for file in &files {
            if !file.complete {
                tracing::debug!(file_id = %file.id, "Skipping incomplete upload");
                summary.record(Outcome::SkippedIncomplete);
                continue;
            }

            let outcome = match self.fetch(source, file).await {
                Ok(path) => {
                    tracing::info!(file_id = %file.id, path = %path.display(), "File downloaded");
                    Outcome::Migrated
                }
                Err(err) => match self.skip_or_abort(err) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        result = Err(err);
                        break;
                    }
                },
            };
            let downloaded = matches!(outcome, Outcome::Migrated);
            summary.record(outcome);
            if downloaded {
                self.pause().await;
            }
        }

        self.finish("download", summary, result)
    }

    /// Upload previously downloaded files from `<files_root>/<store lower>/<id>`.
    ///
    /// `files_root` defaults to the scratch root. Records without a local file are
    /// skipped and counted as missing.
    #[tracing::instrument(skip(self), fields(store = %self.options.logical_store))]
    pub async fn upload_all(&self, files_root: Option<PathBuf>) -> MigrationResult<MigrationSummary> {
        let destination = self.destination()?;
        let settings = self.settings().await?;

        let local = match files_root {
            Some(root) => ScratchDirectory::new(ScratchDirectory::for_store(
                &root,
                self.options.logical_store,
            )),
            None => self.scratch.clone(),
        };

        let files = self.enumerate().await?;
        let mut summary = MigrationSummary {
            total: files.len(),
            ..Default::default()
        };

        let mut result = Ok(());
        for file in &files {
            if !file.complete {
                tracing::debug!(file_id = %file.id, "Skipping incomplete upload");
                summary.record(Outcome::SkippedIncomplete);
                continue;
            }

            match self.upload_local(destination, settings, &local, file).await {
                Ok(outcome) => {
                    let uploaded = matches!(outcome, Outcome::Migrated);
                    summary.record(outcome);
                    if uploaded {
                        self.pause().await;
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.finish("upload", summary, result)
    }

    async fn upload_local(
        &self,
        destination: &dyn StorageProvider,
        settings: &DeploymentSettings,
        local: &ScratchDirectory,
        file: &FileRecord,
    ) -> MigrationResult<Outcome> {
        let cached = local
            .cached(&file.id)
            .await
            .map_err(|e| storage_failure(MigrationPhase::Fetch, &file.id, e))?;
        let Some(local_path) = cached else {
            tracing::warn!(
                file_id = %file.id,
                dir = %local.path().display(),
                "Skipping file with no local copy"
            );
            return Ok(Outcome::SkippedMissing);
        };

        let key = self
            .store_and_record(destination, settings, file, local_path)
            .await?;
        tracing::info!(file_id = %file.id, key = %key, "File uploaded");

        Ok(Outcome::Migrated)
    }
}
