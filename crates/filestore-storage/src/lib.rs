//! Filestore Storage Library
//!
//! This crate provides the storage provider contract and its implementations:
//! Amazon S3 (and S3-compatible services), Google Cloud Storage, GridFS (read only)
//! and the local filesystem.
//!
//! # Object key format
//!
//! Destination keys mirror the platform's own upload paths:
//!
//! - **Uploads**: `{unique_id}/uploads/{room_id}/{user_id}/{file_id}`
//! - **User avatars**: `{unique_id}/avatars/{user_id}`
//! - **Room avatars**: `{unique_id}/avatars/room-{room_id}`
//!
//! Flat-keyed providers (the filesystem) store every object under its bare file ID.
//! Key generation is centralized in the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
pub mod object;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-gridfs")]
pub mod gridfs;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod scratch;
pub mod traits;

// Re-export commonly used types
pub use factory::create_provider;
pub use filestore_core::{KeyLayout, ProviderType};
#[cfg(feature = "storage-gridfs")]
pub use gridfs::GridFsProvider;
pub use keys::{resolve_object_key, ufs_path};
#[cfg(feature = "storage-local")]
pub use local::FileSystemProvider;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
pub use object::ObjectStorageProvider;
pub use scratch::{write_stream, ScratchDirectory};
pub use traits::{StorageError, StorageProvider, StorageResult};
