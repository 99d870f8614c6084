use filestore_core::{TargetConfig, TargetRole};

#[cfg(feature = "storage-local")]
use crate::FileSystemProvider;
#[cfg(feature = "storage-gridfs")]
use crate::GridFsProvider;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
use crate::ObjectStorageProvider;
use crate::{StorageError, StorageProvider, StorageResult};

/// Create the provider of a configured target.
///
/// Returns `None` for reference-only targets, which name a provider without
/// connecting to it. GridFS reads from the catalog database, so it needs `database`.
pub async fn create_provider(
    target: &TargetConfig,
    role: TargetRole,
    #[cfg(feature = "storage-gridfs")] database: Option<&mongodb::Database>,
) -> StorageResult<Option<Box<dyn StorageProvider>>> {
    let provider: Box<dyn StorageProvider> = match target {
        TargetConfig::Reference(provider) => {
            tracing::debug!(provider = %provider, "Reference-only target, no provider created");
            return Ok(None);
        }

        #[cfg(feature = "storage-s3")]
        TargetConfig::AmazonS3(config) => Box::new(ObjectStorageProvider::amazon_s3(config)?),

        #[cfg(not(feature = "storage-s3"))]
        TargetConfig::AmazonS3(_) => {
            return Err(StorageError::ConfigError(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-gcs")]
        TargetConfig::GoogleStorage(config) => {
            Box::new(ObjectStorageProvider::google_storage(config)?)
        }

        #[cfg(not(feature = "storage-gcs"))]
        TargetConfig::GoogleStorage(_) => {
            return Err(StorageError::ConfigError(
                "Google Cloud Storage backend not available (storage-gcs feature not enabled)"
                    .to_string(),
            ))
        }

        #[cfg(feature = "storage-gridfs")]
        TargetConfig::GridFs => {
            if role == TargetRole::Destination {
                return Err(StorageError::ConfigError(
                    "GridFS cannot be used as a destination".to_string(),
                ));
            }
            let database = database.ok_or_else(|| {
                StorageError::ConfigError("GridFS source requires a database connection".to_string())
            })?;
            Box::new(GridFsProvider::new(database.clone()))
        }

        #[cfg(not(feature = "storage-gridfs"))]
        TargetConfig::GridFs => {
            return Err(StorageError::ConfigError(
                "GridFS backend not available (storage-gridfs feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-local")]
        TargetConfig::FileSystem { location } => {
            Box::new(FileSystemProvider::new(location.clone(), role).await?)
        }

        #[cfg(not(feature = "storage-local"))]
        TargetConfig::FileSystem { .. } => {
            return Err(StorageError::ConfigError(
                "Filesystem backend not available (storage-local feature not enabled)".to_string(),
            ))
        }
    };

    tracing::info!(
        provider = %provider.store_type(),
        role = ?role,
        "Storage provider initialized"
    );

    Ok(Some(provider))
}

#[cfg(all(test, feature = "storage-local", feature = "storage-gridfs"))]
mod tests {
    use super::*;
    use filestore_core::ProviderType;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reference_target_has_no_provider() {
        let provider = create_provider(
            &TargetConfig::Reference(ProviderType::AmazonS3),
            TargetRole::Source,
            None,
        )
        .await
        .unwrap();
        assert!(provider.is_none());
    }

    #[tokio::test]
    async fn filesystem_destination_is_created() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("ufs");
        let provider = create_provider(
            &TargetConfig::FileSystem {
                location: location.clone(),
            },
            TargetRole::Destination,
            None,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(provider.store_type(), ProviderType::FileSystem);
        assert!(location.is_dir());
    }

    #[tokio::test]
    async fn gridfs_without_database_is_rejected() {
        let result = create_provider(&TargetConfig::GridFs, TargetRole::Source, None).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
