//! Storage abstraction trait
//!
//! This module defines the StorageProvider trait that all storage backends must implement.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use filestore_core::{FileRecord, KeyLayout, ProviderType};
use thiserror::Error;

use crate::scratch::ScratchDirectory;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not supported by {provider}: {operation}")]
    Unimplemented {
        provider: ProviderType,
        operation: &'static str,
    },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage provider contract
///
/// Every backend (object storage, GridFS, local filesystem) implements this trait so
/// the migrator can copy between any pair of them. Side effects stay inside the
/// backend and the scratch directory; providers never touch catalog records.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider type, used to build store labels.
    fn store_type(&self) -> ProviderType;

    /// How destination keys are shaped for this provider.
    fn key_layout(&self) -> KeyLayout {
        self.store_type().key_layout()
    }

    /// Directory `download` materializes files into. Must be set before downloading.
    fn set_scratch_directory(&mut self, dir: PathBuf);

    /// Fetch the record's object into the scratch directory and return its local path.
    ///
    /// If `<scratch>/<file id>` already exists nothing is fetched and that path is
    /// returned, so re-running after a partial failure does not download again.
    async fn download(&self, collection: &str, file: &FileRecord) -> StorageResult<PathBuf>;

    /// Store the local file at `object_key`, overwriting any existing object.
    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Remove the record's object. Backends may decline.
    async fn delete(&self, _file: &FileRecord, _permanent: bool) -> StorageResult<()> {
        Err(StorageError::Unimplemented {
            provider: self.store_type(),
            operation: "delete",
        })
    }
}

/// Scratch directory of a provider, or a configuration error when it was never set.
pub(crate) fn require_scratch(
    scratch: &Option<ScratchDirectory>,
    provider: ProviderType,
) -> StorageResult<&ScratchDirectory> {
    scratch.as_ref().ok_or_else(|| {
        StorageError::ConfigError(format!(
            "{} scratch directory must be set before downloading",
            provider
        ))
    })
}
