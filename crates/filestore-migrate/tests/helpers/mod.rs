//! Test helpers: in-memory provider and catalog fakes plus record fixtures.
//!
//! Run from workspace root: `cargo test -p filestore-migrate`.

#![allow(dead_code)]

pub mod catalog;
pub mod storage;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use filestore_core::{DeploymentSettings, FileRecord, LogicalStore, ObjectLocation};
use filestore_migrate::MigrationOptions;

pub fn settings() -> DeploymentSettings {
    DeploymentSettings {
        unique_id: "dep1".to_string(),
        site_url: Some("https://chat.example.com".to_string()),
    }
}

pub fn options(scratch_root: &Path, store: LogicalStore) -> MigrationOptions {
    MigrationOptions {
        logical_store: store,
        scratch_root: scratch_root.to_path_buf(),
        skip_errors: false,
        file_delay: Duration::ZERO,
        file_offset: None,
        source_type: None,
    }
}

/// Day `day` of May 2023, noon UTC.
pub fn may(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, day, 12, 0, 0).unwrap()
}

/// Complete record labelled `store` uploaded on `uploaded_at`.
pub fn record(
    id: &str,
    room_id: &str,
    user_id: &str,
    store: &str,
    uploaded_at: DateTime<Utc>,
) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        name: format!("{}.png", id),
        size: 5,
        content_type: "image/png".to_string(),
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        store: store.to_string(),
        complete: true,
        uploading: false,
        location: ObjectLocation::ById,
        url: String::new(),
        path: String::new(),
        uploaded_at: Some(uploaded_at),
    }
}

/// Record already stored in S3 at `path`.
pub fn s3_record(
    id: &str,
    room_id: &str,
    user_id: &str,
    store: LogicalStore,
    path: &str,
    uploaded_at: DateTime<Utc>,
) -> FileRecord {
    FileRecord {
        location: ObjectLocation::AmazonS3 {
            path: path.to_string(),
        },
        ..record(
            id,
            room_id,
            user_id,
            &format!("AmazonS3:{}", store),
            uploaded_at,
        )
    }
}
