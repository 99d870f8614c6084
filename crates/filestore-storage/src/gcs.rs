use std::sync::Arc;

use filestore_core::config::GoogleStorageTargetConfig;
use filestore_core::ProviderType;
use object_store::gcp::GoogleCloudStorageBuilder;

use crate::object::ObjectStorageProvider;
use crate::traits::{StorageError, StorageResult};

impl ObjectStorageProvider {
    /// Google Cloud Storage provider authenticated with a service account key file.
    pub fn google_storage(config: &GoogleStorageTargetConfig) -> StorageResult<Self> {
        if !config.service_account_path.is_file() {
            return Err(StorageError::ConfigError(format!(
                "Google Cloud service account key {} does not exist",
                config.service_account_path.display()
            )));
        }

        let store = GoogleCloudStorageBuilder::new()
            .with_service_account_path(config.service_account_path.to_string_lossy().into_owned())
            .with_bucket_name(config.bucket.clone())
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::debug!(
            bucket = %config.bucket,
            key = %config.service_account_path.display(),
            "Google Cloud Storage provider configured"
        );

        Ok(Self::with_store(
            ProviderType::GoogleCloudStorage,
            Arc::new(store),
            config.bucket.clone(),
        ))
    }
}
