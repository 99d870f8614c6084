use std::collections::HashMap;
use std::time::Duration;

use bson::doc;
use filestore_core::{
    DatabaseConfig, DeploymentSettings, FilePatch, FileRecord, LogicalStore, MigrationError,
    MigrationPhase, MigrationResult, TargetConfig,
};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};

use crate::catalog::{FileCatalog, FileQuery};
use crate::documents::{patch_update, query_filter, query_sort, FileDocument, SettingDocument};
use crate::settings::{self, DETECTION_SETTINGS, SITE_URL, UNIQUE_ID};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SETTINGS_COLLECTION: &str = "rocketchat_settings";

fn catalog_error(phase: MigrationPhase, err: impl std::fmt::Display) -> MigrationError {
    MigrationError::Catalog {
        phase,
        message: err.to_string(),
    }
}

/// File catalog backed by the platform's MongoDB database.
#[derive(Clone)]
pub struct MongoCatalog {
    database: Database,
}

impl MongoCatalog {
    /// Connect and select the configured database, or the URI's default database.
    pub async fn connect(config: &DatabaseConfig) -> MigrationResult<Self> {
        tracing::debug!("setting up mongo client");

        let client = tokio::time::timeout(CONNECT_TIMEOUT, Client::with_uri_str(&config.uri))
            .await
            .map_err(|_| MigrationError::Configuration("mongodb connection timeout".to_string()))?
            .map_err(|e| MigrationError::Configuration(format!("mongodb: {}", e)))?;

        let database = match &config.name {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                MigrationError::Configuration(
                    "No database name given and the connection string names no default database"
                        .to_string(),
                )
            })?,
        };

        tokio::time::timeout(CONNECT_TIMEOUT, database.run_command(doc! { "ping": 1 }, None))
            .await
            .map_err(|_| MigrationError::Configuration("mongodb ping timeout".to_string()))?
            .map_err(|e| MigrationError::Configuration(format!("mongodb ping failed: {}", e)))?;

        tracing::info!(database = %database.name(), "Connected to catalog database");

        Ok(Self { database })
    }

    /// Database handle, shared with the GridFS provider.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn files(&self, store: LogicalStore) -> Collection<FileDocument> {
        self.database.collection(store.collection())
    }

    fn settings_collection(&self) -> Collection<SettingDocument> {
        self.database.collection(SETTINGS_COLLECTION)
    }

    async fn setting(&self, id: &str) -> MigrationResult<Option<String>> {
        let setting = self
            .settings_collection()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| catalog_error(MigrationPhase::Enumerate, e))?;
        Ok(setting.and_then(|s| s.string_value()))
    }

    /// Target the deployment currently stores uploads in.
    #[tracing::instrument(skip(self), fields(db.collection = SETTINGS_COLLECTION))]
    pub async fn detect_target(&self) -> MigrationResult<TargetConfig> {
        let cursor = self
            .settings_collection()
            .find(doc! { "_id": { "$in": DETECTION_SETTINGS.to_vec() } }, None)
            .await
            .map_err(|e| catalog_error(MigrationPhase::Init, e))?;
        let documents: Vec<SettingDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| catalog_error(MigrationPhase::Init, e))?;

        let values: HashMap<String, String> = documents
            .into_iter()
            .filter_map(|s| s.string_value().map(|v| (s.id, v)))
            .collect();

        let target = settings::detect_target(&values)?;
        tracing::info!(provider = %target.provider_type(), "Detected deployment storage target");
        Ok(target)
    }
}

#[async_trait::async_trait]
impl FileCatalog for MongoCatalog {
    #[tracing::instrument(skip(self), fields(db.collection = SETTINGS_COLLECTION))]
    async fn settings(&self) -> MigrationResult<DeploymentSettings> {
        let unique_id = self
            .setting(UNIQUE_ID)
            .await?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                catalog_error(MigrationPhase::Enumerate, "Deployment uniqueID setting not found")
            })?;
        let site_url = self.setting(SITE_URL).await?.filter(|url| !url.is_empty());

        tracing::debug!(unique_id = %unique_id, site_url = ?site_url, "Deployment settings loaded");

        Ok(DeploymentSettings {
            unique_id,
            site_url,
        })
    }

    #[tracing::instrument(skip(self), fields(db.collection = query.store().collection(), store = %query.label))]
    async fn find_files(&self, query: &FileQuery) -> MigrationResult<Vec<FileRecord>> {
        let options = FindOptions::builder().sort(query_sort()).build();
        let cursor = self
            .files(query.store())
            .find(query_filter(query), options)
            .await
            .map_err(|e| catalog_error(MigrationPhase::Enumerate, e))?;

        let documents: Vec<FileDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| catalog_error(MigrationPhase::Enumerate, e))?;

        tracing::info!(count = documents.len(), "Enumerated file records");

        Ok(documents.into_iter().map(FileDocument::into_record).collect())
    }

    #[tracing::instrument(skip(self, patch), fields(db.collection = store.collection(), db.record_id = %file_id))]
    async fn apply_patch(
        &self,
        store: LogicalStore,
        file_id: &str,
        patch: &FilePatch,
    ) -> MigrationResult<()> {
        let result = self
            .files(store)
            .update_one(doc! { "_id": file_id }, patch_update(patch), None)
            .await
            .map_err(|e| catalog_error(MigrationPhase::Persist, e))?;

        if result.matched_count == 0 {
            return Err(catalog_error(
                MigrationPhase::Persist,
                format!("File record {} no longer exists", file_id),
            ));
        }

        Ok(())
    }
}
