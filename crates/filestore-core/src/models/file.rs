//! File record model: one attachment's metadata as stored in the platform catalog.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_types::ProviderType;

/// Named partition of attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalStore {
    Uploads,
    Avatars,
}

impl LogicalStore {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalStore::Uploads => "Uploads",
            LogicalStore::Avatars => "Avatars",
        }
    }

    /// Catalog collection holding this store's file records. GridFS buckets share the name.
    pub fn collection(&self) -> &'static str {
        match self {
            LogicalStore::Uploads => "rocketchat_uploads",
            LogicalStore::Avatars => "rocketchat_avatars",
        }
    }

    /// Lower-cased name used for scratch subdirectories and object key segments.
    pub fn dir_name(&self) -> &'static str {
        match self {
            LogicalStore::Uploads => "uploads",
            LogicalStore::Avatars => "avatars",
        }
    }
}

impl FromStr for LogicalStore {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploads" => Ok(LogicalStore::Uploads),
            "avatars" => Ok(LogicalStore::Avatars),
            _ => Err(anyhow::anyhow!("Invalid store name: {}", s)),
        }
    }
}

impl Display for LogicalStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// `"<ProviderType>:<LogicalStore>"`, the record's current physical home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreLabel {
    pub provider: ProviderType,
    pub store: LogicalStore,
}

impl StoreLabel {
    pub fn new(provider: ProviderType, store: LogicalStore) -> Self {
        Self { provider, store }
    }
}

impl Display for StoreLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.provider, self.store)
    }
}

impl FromStr for StoreLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, store) = s
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid store label: {}", s))?;
        Ok(Self {
            provider: provider.parse()?,
            store: store.parse()?,
        })
    }
}

/// Provider-specific location sub-object of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationField {
    AmazonS3,
    GoogleStorage,
}

impl LocationField {
    pub const ALL: [LocationField; 2] = [LocationField::AmazonS3, LocationField::GoogleStorage];

    /// Name of the sub-document in the catalog.
    pub fn field_name(&self) -> &'static str {
        match self {
            LocationField::AmazonS3 => "AmazonS3",
            LocationField::GoogleStorage => "GoogleStorage",
        }
    }
}

/// Where a record's bytes live inside its provider.
///
/// At most one provider-specific location exists per record; GridFS and the
/// filesystem key objects by the record ID itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ObjectLocation {
    #[default]
    ById,
    AmazonS3 {
        path: String,
    },
    GoogleStorage {
        path: String,
    },
}

impl ObjectLocation {
    /// The location a destination provider records for an object stored at `key`.
    pub fn for_destination(provider: ProviderType, key: &str) -> Self {
        match provider {
            ProviderType::AmazonS3 => ObjectLocation::AmazonS3 {
                path: key.to_string(),
            },
            ProviderType::GoogleCloudStorage => ObjectLocation::GoogleStorage {
                path: key.to_string(),
            },
            ProviderType::GridFs | ProviderType::FileSystem => ObjectLocation::ById,
        }
    }

    pub fn field(&self) -> Option<LocationField> {
        match self {
            ObjectLocation::ById => None,
            ObjectLocation::AmazonS3 { .. } => Some(LocationField::AmazonS3),
            ObjectLocation::GoogleStorage { .. } => Some(LocationField::GoogleStorage),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            ObjectLocation::ById => None,
            ObjectLocation::AmazonS3 { path } | ObjectLocation::GoogleStorage { path } => {
                Some(path)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub room_id: String,
    pub user_id: String,
    /// Raw store label as found in the catalog.
    pub store: String,
    pub complete: bool,
    pub uploading: bool,
    pub location: ObjectLocation,
    pub url: String,
    pub path: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Room avatars live in the Avatars store and carry the room they belong to.
    pub fn is_room_avatar(&self, store: LogicalStore) -> bool {
        store == LogicalStore::Avatars && !self.room_id.is_empty()
    }
}
