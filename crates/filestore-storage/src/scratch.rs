//! Scratch directory: local staging area between a source download and a destination upload.
//!
//! Files are stored as `<dir>/<file id>`. A file is only ever visible under that name
//! once fully written (it is written to a hidden sibling first and renamed), so the
//! presence of the file is a reliable cache hit for re-runs.

use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use filestore_core::LogicalStore;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct ScratchDirectory {
    dir: PathBuf,
}

impl ScratchDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<root>/<store>` with the store name lower-cased.
    pub fn for_store(root: &Path, store: LogicalStore) -> PathBuf {
        root.join(store.dir_name())
    }

    /// Create the directory (and its parents) if missing.
    pub async fn ensure(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Temp directory {} doesn't exist and unable to create it: {}",
                self.dir.display(),
                e
            ))
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Deterministic scratch path of a file.
    pub fn file_path(&self, file_id: &str) -> StorageResult<PathBuf> {
        if file_id.is_empty()
            || file_id.contains('/')
            || file_id.contains('\\')
            || file_id.contains("..")
        {
            return Err(StorageError::InvalidKey(format!(
                "File id {:?} cannot be used as a scratch file name",
                file_id
            )));
        }
        Ok(self.dir.join(file_id))
    }

    /// Path of an already materialized file, if any.
    pub async fn cached(&self, file_id: &str) -> StorageResult<Option<PathBuf>> {
        let path = self.file_path(file_id)?;
        if fs::try_exists(&path).await? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    fn partial_path(&self, file_id: &str) -> PathBuf {
        self.dir.join(format!(".{}.partial", file_id))
    }

    /// Return the cached file of `file_id`, or run `fetch` to fill it.
    ///
    /// `fetch` streams the object into the partial file it is given and returns the
    /// number of bytes written. The partial file is renamed into place on success and
    /// removed on failure.
    pub async fn materialize<F, Fut>(&self, file_id: &str, fetch: F) -> StorageResult<PathBuf>
    where
        F: FnOnce(PathBuf) -> Fut + Send,
        Fut: Future<Output = StorageResult<u64>> + Send,
    {
        if let Some(path) = self.cached(file_id).await? {
            tracing::debug!(
                file_id = %file_id,
                path = %path.display(),
                "Reusing file already present in scratch directory"
            );
            return Ok(path);
        }

        let path = self.file_path(file_id)?;
        let partial = self.partial_path(file_id);
        self.ensure().await?;

        let size = match fetch(partial.clone()).await {
            Ok(size) => size,
            Err(e) => {
                fs::remove_file(&partial).await.ok();
                return Err(e);
            }
        };
        fs::rename(&partial, &path).await?;

        tracing::debug!(
            file_id = %file_id,
            path = %path.display(),
            size_bytes = size,
            "File materialized in scratch directory"
        );

        Ok(path)
    }
}

/// Write a stream of chunks to `path`, returning the number of bytes written.
pub async fn write_stream<S>(path: &Path, mut chunks: S) -> StorageResult<u64>
where
    S: Stream<Item = StorageResult<Bytes>> + Unpin,
{
    let mut file = fs::File::create(path).await?;
    let mut size = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(size)
}
