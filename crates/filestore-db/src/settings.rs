//! Deployment settings used by a run: the unique ID, the site URL and the
//! upload storage configuration used for target detection.

use std::collections::HashMap;

use filestore_core::config::S3TargetConfig;
use filestore_core::{MigrationError, MigrationPhase, MigrationResult, TargetConfig};

pub const UNIQUE_ID: &str = "uniqueID";
pub const SITE_URL: &str = "Site_Url";
pub const STORAGE_TYPE: &str = "FileUpload_Storage_Type";
pub const S3_ACCESS_KEY_ID: &str = "FileUpload_S3_AWSAccessKeyId";
pub const S3_SECRET_ACCESS_KEY: &str = "FileUpload_S3_AWSSecretAccessKey";
pub const S3_BUCKET: &str = "FileUpload_S3_Bucket";
pub const S3_REGION: &str = "FileUpload_S3_Region";
pub const S3_BUCKET_URL: &str = "FileUpload_S3_BucketURL";
pub const FILESYSTEM_PATH: &str = "FileUpload_FileSystemPath";

/// Settings read for target detection.
pub const DETECTION_SETTINGS: [&str; 7] = [
    STORAGE_TYPE,
    S3_ACCESS_KEY_ID,
    S3_SECRET_ACCESS_KEY,
    S3_BUCKET,
    S3_REGION,
    S3_BUCKET_URL,
    FILESYSTEM_PATH,
];

const DEFAULT_S3_ENDPOINT: &str = "s3.amazonaws.com";

fn detection_error(message: String) -> MigrationError {
    MigrationError::Catalog {
        phase: MigrationPhase::Init,
        message,
    }
}

fn required(settings: &HashMap<String, String>, id: &str) -> MigrationResult<String> {
    settings
        .get(id)
        .cloned()
        .ok_or_else(|| detection_error(format!("Setting {} not found", id)))
}

/// Build the target the deployment currently uploads to from its settings.
pub fn detect_target(settings: &HashMap<String, String>) -> MigrationResult<TargetConfig> {
    let storage_type = required(settings, STORAGE_TYPE)?;

    match storage_type.as_str() {
        "GridFS" => Ok(TargetConfig::GridFs),
        "AmazonS3" => {
            let endpoint = settings
                .get(S3_BUCKET_URL)
                .filter(|url| !url.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string());

            Ok(TargetConfig::AmazonS3(S3TargetConfig {
                endpoint,
                bucket: required(settings, S3_BUCKET)?,
                access_id: required(settings, S3_ACCESS_KEY_ID)?,
                access_key: required(settings, S3_SECRET_ACCESS_KEY)?,
                region: required(settings, S3_REGION)?,
                use_ssl: true,
            }))
        }
        "FileSystem" => Ok(TargetConfig::FileSystem {
            location: required(settings, FILESYSTEM_PATH)?.into(),
        }),
        other => Err(MigrationError::Configuration(format!(
            "Unable to detect supported file upload storage type {:?} (Google Cloud Storage cannot be detected)",
            other
        ))),
    }
}
