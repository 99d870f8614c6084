//! Object storage provider shared by Amazon S3 and Google Cloud Storage.
//!
//! Both backends go through `object_store`; they differ only in how the store is
//! built (see `s3.rs` and `gcs.rs`) and in which location sub-object of a record
//! names the object.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use filestore_core::{FileRecord, ObjectLocation, ProviderType};
use futures::StreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, Error as ObjectStoreError, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload,
};

use crate::scratch::{write_stream, ScratchDirectory};
use crate::traits::{require_scratch, StorageError, StorageProvider, StorageResult};

pub struct ObjectStorageProvider {
    provider_type: ProviderType,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    scratch: Option<ScratchDirectory>,
}

impl ObjectStorageProvider {
    /// Wrap an already built object store.
    pub fn with_store(
        provider_type: ProviderType,
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            provider_type,
            store,
            bucket: bucket.into(),
            scratch: None,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object path of a record stored in this provider.
    fn source_path<'a>(&self, file: &'a FileRecord) -> StorageResult<&'a str> {
        let path = match (&self.provider_type, &file.location) {
            (ProviderType::AmazonS3, ObjectLocation::AmazonS3 { path })
            | (ProviderType::GoogleCloudStorage, ObjectLocation::GoogleStorage { path }) => {
                Some(path.as_str())
            }
            _ => None,
        };

        path.filter(|p| !p.is_empty()).ok_or_else(|| {
            StorageError::NotFound(format!(
                "File {} has no {} location",
                file.id, self.provider_type
            ))
        })
    }

    /// Stream the object at `path` into `dest`.
    async fn fetch(&self, path: &str, dest: PathBuf) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let location = ObjectPath::from(path);

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "{} download failed",
                    self.provider_type
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let chunks = result
            .into_stream()
            .map(|chunk| chunk.map_err(|e| StorageError::DownloadFailed(e.to_string())));
        let size = write_stream(&dest, chunks).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %path,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "{} stream download error",
                self.provider_type
            );
            e
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "{} download successful",
            self.provider_type
        );

        Ok(size)
    }
}

#[async_trait]
impl StorageProvider for ObjectStorageProvider {
    fn store_type(&self) -> ProviderType {
        self.provider_type
    }

    fn set_scratch_directory(&mut self, dir: PathBuf) {
        self.scratch = Some(ScratchDirectory::new(dir));
    }

    async fn download(&self, _collection: &str, file: &FileRecord) -> StorageResult<PathBuf> {
        let scratch = require_scratch(&self.scratch, self.provider_type)?;
        if let Some(path) = scratch.cached(&file.id).await? {
            return Ok(path);
        }

        let object_path = self.source_path(file)?;
        scratch
            .materialize(&file.id, |partial| self.fetch(object_path, partial))
            .await
    }

    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read file {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let size = data.len();
        let location = ObjectPath::from(object_key);

        let mut attributes = Attributes::new();
        if !content_type.is_empty() {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();
        self.store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %object_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "{} upload failed",
                    self.provider_type
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %object_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "{} upload successful",
            self.provider_type
        );

        Ok(())
    }

    /// Only permanent deletes on S3 are supported.
    ///
    /// Soft delete would tag the object `delete=true`, but object tags can only be
    /// set when an object is written, so it is declined rather than rewriting the object.
    async fn delete(&self, file: &FileRecord, permanent: bool) -> StorageResult<()> {
        if self.provider_type != ProviderType::AmazonS3 {
            return Err(StorageError::Unimplemented {
                provider: self.provider_type,
                operation: "delete",
            });
        }
        if !permanent {
            return Err(StorageError::Unimplemented {
                provider: self.provider_type,
                operation: "soft delete",
            });
        }

        let path = self.source_path(file)?;
        let location = ObjectPath::from(path);

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %path, "Object deleted");
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }
}
