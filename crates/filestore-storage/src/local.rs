use std::path::{Path, PathBuf};

use async_trait::async_trait;
use filestore_core::{FileRecord, ProviderType, TargetRole};
use tokio::fs;

use crate::scratch::ScratchDirectory;
use crate::traits::{require_scratch, StorageError, StorageProvider, StorageResult};

/// Local filesystem provider. Objects are stored flat, as `<location>/<file id>`.
#[derive(Clone)]
pub struct FileSystemProvider {
    location: PathBuf,
    scratch: Option<ScratchDirectory>,
}

impl FileSystemProvider {
    /// Create a provider rooted at `location`.
    ///
    /// A source location must already exist; a destination location is created.
    pub async fn new(location: impl Into<PathBuf>, role: TargetRole) -> StorageResult<Self> {
        let location = location.into();

        match role {
            TargetRole::Source => {
                if !fs::try_exists(&location).await.unwrap_or(false) {
                    return Err(StorageError::ConfigError(format!(
                        "Source directory {} does not exist",
                        location.display()
                    )));
                }
            }
            TargetRole::Destination => {
                fs::create_dir_all(&location).await.map_err(|e| {
                    StorageError::ConfigError(format!(
                        "Failed to create storage directory {}: {}",
                        location.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(FileSystemProvider {
            location,
            scratch: None,
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Convert an object key to a path under the location, rejecting traversal.
    fn key_to_path(&self, object_key: &str) -> StorageResult<PathBuf> {
        if object_key.is_empty() || object_key.contains("..") || object_key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Object key {:?} contains invalid characters",
                object_key
            )));
        }

        let path = self.location.join(object_key);
        if path.strip_prefix(&self.location).is_err() {
            return Err(StorageError::InvalidKey(
                "Object key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Copy the stored file `file_id` to `dest`.
    async fn copy_out(&self, file_id: &str, dest: PathBuf) -> StorageResult<u64> {
        let path = self.key_to_path(file_id)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let size = fs::copy(&path, &dest).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(size)
    }
}

#[async_trait]
impl StorageProvider for FileSystemProvider {
    fn store_type(&self) -> ProviderType {
        ProviderType::FileSystem
    }

    fn set_scratch_directory(&mut self, dir: PathBuf) {
        self.scratch = Some(ScratchDirectory::new(dir));
    }

    async fn download(&self, _collection: &str, file: &FileRecord) -> StorageResult<PathBuf> {
        let scratch = require_scratch(&self.scratch, ProviderType::FileSystem)?;
        scratch
            .materialize(&file.id, |partial| self.copy_out(&file.id, partial))
            .await
    }

    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.key_to_path(object_key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let size = fs::copy(local_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %object_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    /// Both soft and permanent deletes remove the file.
    async fn delete(&self, file: &FileRecord, _permanent: bool) -> StorageResult<()> {
        let path = self.key_to_path(&file.id)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "Local storage delete successful");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            complete: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn source_location_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let result = FileSystemProvider::new(&missing, TargetRole::Source).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));

        FileSystemProvider::new(&missing, TargetRole::Destination)
            .await
            .unwrap();
        assert!(missing.is_dir());
    }

    #[tokio::test]
    async fn download_copies_into_scratch() {
        let source = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        std::fs::write(source.path().join("f1"), b"content").unwrap();

        let mut provider = FileSystemProvider::new(source.path(), TargetRole::Source)
            .await
            .unwrap();
        provider.set_scratch_directory(scratch.path().join("uploads"));

        let path = provider
            .download("rocketchat_uploads", &record("f1"))
            .await
            .unwrap();
        assert_eq!(path, scratch.path().join("uploads").join("f1"));
        assert_eq!(std::fs::read(&path).unwrap(), b"content");

        let err = provider
            .download("rocketchat_uploads", &record("f2"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn upload_overwrites_under_key() {
        let dest = tempdir().unwrap();
        let work = tempdir().unwrap();
        let local = work.path().join("f1");

        let provider = FileSystemProvider::new(dest.path(), TargetRole::Destination)
            .await
            .unwrap();

        std::fs::write(&local, b"one").unwrap();
        provider.upload("f1", &local, "text/plain").await.unwrap();
        std::fs::write(&local, b"two").unwrap();
        provider.upload("f1", &local, "text/plain").await.unwrap();

        assert_eq!(std::fs::read(dest.path().join("f1")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn upload_rejects_traversal() {
        let dest = tempdir().unwrap();
        let provider = FileSystemProvider::new(dest.path(), TargetRole::Destination)
            .await
            .unwrap();

        let err = provider
            .upload("../escape", Path::new("/dev/null"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f1"), b"x").unwrap();

        let provider = FileSystemProvider::new(dir.path(), TargetRole::Source)
            .await
            .unwrap();
        provider.delete(&record("f1"), true).await.unwrap();
        assert!(!dir.path().join("f1").exists());
        provider.delete(&record("f1"), true).await.unwrap();
    }
}
