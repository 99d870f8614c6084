use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage provider types
///
/// The string form is the label the platform writes into a file record's `store`
/// field (`"AmazonS3:Uploads"`), so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProviderType {
    #[serde(rename = "GridFS")]
    GridFs,
    AmazonS3,
    GoogleCloudStorage,
    FileSystem,
}

/// How a provider lays out object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// `{unique_id}/{store}/...` keys mirroring the platform's own upload paths.
    Hierarchical,
    /// Objects are keyed by the bare file ID.
    Flat,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::GridFs,
        ProviderType::AmazonS3,
        ProviderType::GoogleCloudStorage,
        ProviderType::FileSystem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::GridFs => "GridFS",
            ProviderType::AmazonS3 => "AmazonS3",
            ProviderType::GoogleCloudStorage => "GoogleCloudStorage",
            ProviderType::FileSystem => "FileSystem",
        }
    }

    pub fn key_layout(&self) -> KeyLayout {
        match self {
            ProviderType::FileSystem => KeyLayout::Flat,
            _ => KeyLayout::Hierarchical,
        }
    }

    /// GridFS buckets belong to the platform's database and are only ever read from.
    pub fn accepts_uploads(&self) -> bool {
        !matches!(self, ProviderType::GridFs)
    }
}

impl FromStr for ProviderType {
    type Err = anyhow::Error;

    /// Accepts both store labels (`GridFS`, `AmazonS3`, ...) and the short names used
    /// on the command line (`gridfs`, `s3`, `google`, `fs`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gridfs" => Ok(ProviderType::GridFs),
            "s3" | "amazons3" => Ok(ProviderType::AmazonS3),
            "google" | "googlestorage" | "googlecloudstorage" => {
                Ok(ProviderType::GoogleCloudStorage)
            }
            "fs" | "filesystem" => Ok(ProviderType::FileSystem),
            _ => Err(anyhow::anyhow!("Invalid storage provider type: {}", s)),
        }
    }
}

impl Display for ProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
