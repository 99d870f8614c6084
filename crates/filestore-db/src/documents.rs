//! BSON shapes of the platform's collections and their conversion to domain types.

use bson::{doc, Bson, Document};
use filestore_core::{FilePatch, FileRecord, LocationField, ObjectLocation, ProviderType};
use serde::{Deserialize, Serialize};

use crate::catalog::FileQuery;

/// `{ path }` location sub-document written by object-storage providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathDocument {
    #[serde(default)]
    pub path: String,
}

/// Document of `rocketchat_uploads` / `rocketchat_avatars`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Stored as int32, int64 or double depending on the writer.
    #[serde(default)]
    pub size: Option<Bson>,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    #[serde(rename = "rid", default)]
    pub room_id: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub complete: Option<bool>,
    #[serde(default)]
    pub uploading: Option<bool>,
    #[serde(rename = "AmazonS3", default)]
    pub amazon_s3: Option<PathDocument>,
    #[serde(rename = "GoogleStorage", default)]
    pub google_storage: Option<PathDocument>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "uploadedAt", default)]
    pub uploaded_at: Option<bson::DateTime>,
}

fn size_of(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

impl FileDocument {
    /// Location sub-object that matches the record's store label, falling back to
    /// whichever one is present.
    fn location(&self) -> ObjectLocation {
        let s3 = self
            .amazon_s3
            .as_ref()
            .filter(|d| !d.path.is_empty())
            .map(|d| ObjectLocation::AmazonS3 {
                path: d.path.clone(),
            });
        let gcs = self
            .google_storage
            .as_ref()
            .filter(|d| !d.path.is_empty())
            .map(|d| ObjectLocation::GoogleStorage {
                path: d.path.clone(),
            });

        let prefers_gcs = self
            .store
            .as_deref()
            .is_some_and(|s| s.starts_with(ProviderType::GoogleCloudStorage.as_str()));

        let (first, second) = if prefers_gcs { (gcs, s3) } else { (s3, gcs) };
        first.or(second).unwrap_or_default()
    }

    pub fn into_record(self) -> FileRecord {
        let location = self.location();
        FileRecord {
            size: size_of(self.size.as_ref()),
            location,
            id: self.id,
            name: self.name.unwrap_or_default(),
            content_type: self.content_type.unwrap_or_default(),
            room_id: self.room_id.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
            store: self.store.unwrap_or_default(),
            complete: self.complete.unwrap_or(false),
            uploading: self.uploading.unwrap_or(false),
            url: self.url.unwrap_or_default(),
            path: self.path.unwrap_or_default(),
            uploaded_at: self.uploaded_at.map(|ts| ts.to_chrono()),
        }
    }
}

/// Filter selecting the records of a query.
pub fn query_filter(query: &FileQuery) -> Document {
    let mut filter = doc! { "store": query.label.to_string() };
    if let Some(since) = query.uploaded_since {
        filter.insert(
            "uploadedAt",
            doc! { "$gte": bson::DateTime::from_chrono(since) },
        );
    }
    filter
}

/// Newest records first.
pub fn query_sort() -> Document {
    doc! { "uploadedAt": -1 }
}

/// `$set` / `$unset` update document of a patch.
pub fn patch_update(patch: &FilePatch) -> Document {
    let mut set = doc! {
        "store": patch.store.clone(),
        "url": patch.url.clone(),
        "path": patch.path.clone(),
    };
    if let (Some(field), Some(path)) = (patch.location.field(), patch.location.path()) {
        set.insert(field.field_name(), doc! { "path": path });
    }

    let mut update = doc! { "$set": set };
    if !patch.unset.is_empty() {
        let unset: Document = patch
            .unset
            .iter()
            .map(|field: &LocationField| (field.field_name().to_string(), Bson::String(String::new())))
            .collect();
        update.insert("$unset", unset);
    }
    update
}

/// `rocketchat_settings` document. Values are usually strings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub value: Option<Bson>,
}

impl SettingDocument {
    pub fn string_value(&self) -> Option<String> {
        match &self.value {
            Some(Bson::String(s)) => Some(s.clone()),
            Some(Bson::Boolean(b)) => Some(b.to_string()),
            Some(Bson::Int32(n)) => Some(n.to_string()),
            Some(Bson::Int64(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}
