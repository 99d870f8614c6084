//! GridFS provider. Read only: the platform's legacy default store is only ever a
//! migration source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bson::Bson;
use filestore_core::{FileRecord, ProviderType};
use futures::AsyncReadExt;
use mongodb::error::{Error as MongoError, ErrorKind, GridFsErrorKind};
use mongodb::options::GridFsBucketOptions;
use mongodb::Database;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::scratch::ScratchDirectory;
use crate::traits::{require_scratch, StorageError, StorageProvider, StorageResult};

const COPY_BUFFER_SIZE: usize = 256 * 1024;

pub struct GridFsProvider {
    database: Database,
    scratch: Option<ScratchDirectory>,
}

impl GridFsProvider {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            scratch: None,
        }
    }

    /// Copy the GridFS file `file_id` into `dest` chunk by chunk.
    async fn fetch(&self, bucket_name: &str, file_id: &str, dest: PathBuf) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let bucket = self.database.gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(bucket_name.to_string())
                .build(),
        );

        let mut stream = bucket
            .open_download_stream(Bson::String(file_id.to_string()))
            .await
            .map_err(|e| map_gridfs_error(e, file_id))?;

        let mut file = fs::File::create(&dest).await?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut size = 0u64;

        loop {
            let read = stream
                .read(&mut buffer)
                .await
                .map_err(|e| StorageError::DownloadFailed(format!("{}: {}", file_id, e)))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read]).await?;
            size += read as u64;
        }
        file.flush().await?;

        tracing::info!(
            bucket = %bucket_name,
            file_id = %file_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GridFS download successful"
        );

        Ok(size)
    }
}

fn map_gridfs_error(err: MongoError, file_id: &str) -> StorageError {
    match *err.kind {
        ErrorKind::GridFs {
            0: GridFsErrorKind::FileNotFound { .. },
            ..
        } => StorageError::NotFound(file_id.to_string()),
        _ => {
            tracing::error!(error = %err, file_id = %file_id, "GridFS download failed");
            StorageError::DownloadFailed(err.to_string())
        }
    }
}

#[async_trait]
impl StorageProvider for GridFsProvider {
    fn store_type(&self) -> ProviderType {
        ProviderType::GridFs
    }

    fn set_scratch_directory(&mut self, dir: PathBuf) {
        self.scratch = Some(ScratchDirectory::new(dir));
    }

    /// The GridFS bucket shares its name with the store's catalog collection.
    async fn download(&self, collection: &str, file: &FileRecord) -> StorageResult<PathBuf> {
        let scratch = require_scratch(&self.scratch, ProviderType::GridFs)?;
        scratch
            .materialize(&file.id, |partial| self.fetch(collection, &file.id, partial))
            .await
    }

    async fn upload(
        &self,
        _object_key: &str,
        _local_path: &Path,
        _content_type: &str,
    ) -> StorageResult<()> {
        Err(StorageError::Unimplemented {
            provider: ProviderType::GridFs,
            operation: "upload",
        })
    }
}
