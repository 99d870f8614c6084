//! Configuration module
//!
//! Resolves the migration configuration from the environment (optionally through a
//! `.env` file) and parses source/destination connection strings. The CLI overrides
//! individual values with its flags before calling `validate`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::LogicalStore;
use crate::storage_types::ProviderType;

const DEFAULT_TEMP_FILE_LOCATION: &str = "files";
const DEFAULT_FILE_DELAY_MS: u64 = 10;

/// Which side of a migration a target describes. Only used for messages and for
/// deciding whether a reference-only target is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Source,
    Destination,
}

impl TargetRole {
    fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Source => "source",
            TargetRole::Destination => "destination",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3TargetConfig {
    /// Host (and optional port) of the S3-compatible endpoint, or a full URL.
    pub endpoint: String,
    pub bucket: String,
    pub access_id: String,
    pub access_key: String,
    pub region: String,
    pub use_ssl: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoogleStorageTargetConfig {
    /// Path to the service account JSON key.
    pub service_account_path: PathBuf,
    pub bucket: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetConfig {
    GridFs,
    AmazonS3(S3TargetConfig),
    GoogleStorage(GoogleStorageTargetConfig),
    FileSystem { location: PathBuf },
    /// Provider named only to select records by store label; no connection is made.
    Reference(ProviderType),
}

impl TargetConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            TargetConfig::GridFs => ProviderType::GridFs,
            TargetConfig::AmazonS3(_) => ProviderType::AmazonS3,
            TargetConfig::GoogleStorage(_) => ProviderType::GoogleCloudStorage,
            TargetConfig::FileSystem { .. } => ProviderType::FileSystem,
            TargetConfig::Reference(provider) => *provider,
        }
    }

    /// Parse a target from its type name and connection string.
    ///
    /// * s3: `s3://<endpoint>/<bucket>?accessId=..&accessKey=..&region=..&ssl=true`
    /// * google: `<service account json path>/<bucket>`
    /// * fs / filesystem: the directory
    /// * gridfs: no connection string
    ///
    /// With `reference_only`, object-storage sources may omit the connection string.
    pub fn parse(
        role: TargetRole,
        kind: &str,
        connection: Option<&str>,
        reference_only: bool,
    ) -> Result<Self, anyhow::Error> {
        let provider: ProviderType = kind.parse()?;
        let connection = connection.map(str::trim).filter(|c| !c.is_empty());

        if role == TargetRole::Destination && !provider.accepts_uploads() {
            return Err(anyhow::anyhow!(
                "You cannot use {} as a destination target",
                provider
            ));
        }

        match provider {
            ProviderType::GridFs => Ok(TargetConfig::GridFs),
            ProviderType::AmazonS3 | ProviderType::GoogleCloudStorage
                if connection.is_none() && reference_only && role == TargetRole::Source =>
            {
                Ok(TargetConfig::Reference(provider))
            }
            _ => {
                let connection = connection.ok_or_else(|| {
                    anyhow::anyhow!("The {} target information is incomplete", role.as_str())
                })?;
                match provider {
                    ProviderType::AmazonS3 => Ok(TargetConfig::AmazonS3(parse_s3(connection)?)),
                    ProviderType::GoogleCloudStorage => {
                        Ok(TargetConfig::GoogleStorage(parse_google(connection)?))
                    }
                    _ => Ok(TargetConfig::FileSystem {
                        location: PathBuf::from(connection.trim_end_matches('/')),
                    }),
                }
            }
        }
    }
}

fn parse_s3(connection: &str) -> Result<S3TargetConfig, anyhow::Error> {
    let url = url::Url::parse(connection)
        .map_err(|e| anyhow::anyhow!("Invalid S3 connection string: {}", e))?;

    let mut endpoint = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("The informed S3 connection string doesn't contain the endpoint field")
        })?
        .to_string();
    if let Some(port) = url.port() {
        endpoint = format!("{}:{}", endpoint, port);
    }

    let bucket = url.path().trim_matches('/').to_string();
    if bucket.is_empty() {
        return Err(anyhow::anyhow!(
            "The informed S3 connection string doesn't contain the bucket field"
        ));
    }

    let query = |name: &str| -> Result<String, anyhow::Error> {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "The informed S3 connection string doesn't contain the {} field",
                    name
                )
            })
    };

    let use_ssl = query("ssl")?
        .parse::<bool>()
        .map_err(|_| anyhow::anyhow!("The ssl field of the S3 connection string must be true or false"))?;

    Ok(S3TargetConfig {
        endpoint,
        bucket,
        access_id: query("accessId")?,
        access_key: query("accessKey")?,
        region: query("region")?,
        use_ssl,
    })
}

fn parse_google(connection: &str) -> Result<GoogleStorageTargetConfig, anyhow::Error> {
    let (key, bucket) = connection.rsplit_once('/').ok_or_else(|| {
        anyhow::anyhow!("The informed Google Cloud connection string doesn't respect the <key>/<bucket> pattern")
    })?;
    if key.is_empty() {
        return Err(anyhow::anyhow!(
            "The informed Google Cloud connection string doesn't contain the json key field"
        ));
    }
    if bucket.is_empty() {
        return Err(anyhow::anyhow!(
            "The informed Google Cloud connection string doesn't contain the bucket field"
        ));
    }
    Ok(GoogleStorageTargetConfig {
        service_account_path: PathBuf::from(key),
        bucket: bucket.to_string(),
    })
}

/// Parse a resume offset given as RFC 3339 or as a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_file_offset(value: &str) -> Result<DateTime<Utc>, anyhow::Error> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid file offset: {}", value))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid file offset: {}", value))
}

/// Catalog connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub uri: String,
    /// Falls back to the default database named in the URI.
    pub name: Option<String>,
}

/// Fully resolved configuration of one migration run.
#[derive(Clone, Debug)]
pub struct MigratorConfig {
    pub database: DatabaseConfig,
    pub source: Option<TargetConfig>,
    pub destination: Option<TargetConfig>,
    pub logical_store: LogicalStore,
    pub scratch_root: PathBuf,
    pub skip_errors: bool,
    pub file_delay: Duration,
    pub file_offset: Option<DateTime<Utc>>,
    pub debug: bool,
}

impl MigratorConfig {
    /// Load configuration from the environment.
    ///
    /// `reference_only` lets object-storage sources be named without credentials
    /// (upload runs only need the source's store label).
    pub fn from_env(reference_only: bool) -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let uri = env::var("DATABASE_URL").unwrap_or_default();
        let name = env::var("DATABASE_NAME").ok().filter(|n| !n.is_empty());

        let source = read_target(TargetRole::Source, "SOURCE", reference_only)?;
        let destination = read_target(TargetRole::Destination, "DESTINATION", reference_only)?;

        let logical_store = env::var("STORE")
            .ok()
            .map(|s| s.parse::<LogicalStore>())
            .transpose()?
            .unwrap_or(LogicalStore::Uploads);

        let scratch_root = env::var("TEMP_FILE_LOCATION")
            .unwrap_or_else(|_| DEFAULT_TEMP_FILE_LOCATION.to_string());

        let skip_errors = env::var("SKIP_ERRORS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let file_delay = parse_file_delay(env::var("FILE_DELAY").ok().as_deref())?;

        let file_offset = env::var("FILE_OFFSET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| parse_file_offset(&v))
            .transpose()?;

        let debug = env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database: DatabaseConfig { uri, name },
            source,
            destination,
            logical_store,
            scratch_root: normalize_scratch_root(&scratch_root),
            skip_errors,
            file_delay,
            file_offset,
            debug,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database.uri.is_empty() {
            return Err(anyhow::anyhow!(
                "The Rocket.Chat database connection information must be provided (DATABASE_URL)"
            ));
        }

        if self.source.is_none() && self.destination.is_none() {
            return Err(anyhow::anyhow!(
                "At least a source or destination store must be provided"
            ));
        }

        if let Some(destination) = &self.destination {
            if matches!(destination, TargetConfig::Reference(_)) {
                return Err(anyhow::anyhow!(
                    "The destination target information is incomplete"
                ));
            }
            if !destination.provider_type().accepts_uploads() {
                return Err(anyhow::anyhow!(
                    "You cannot use {} as a destination target",
                    destination.provider_type()
                ));
            }
        }

        Ok(())
    }
}

/// Pause between files, e.g. `10ms` or `1s`. Unset or empty means the default delay.
pub fn parse_file_delay(value: Option<&str>) -> Result<Duration, anyhow::Error> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => humantime::parse_duration(value)
            .map_err(|e| anyhow::anyhow!("Invalid file delay {}: {}", value, e)),
        None => Ok(Duration::from_millis(DEFAULT_FILE_DELAY_MS)),
    }
}

/// Trailing slashes are trimmed; an empty value means the default location.
pub fn normalize_scratch_root(value: &str) -> PathBuf {
    let trimmed = value.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from(DEFAULT_TEMP_FILE_LOCATION)
    } else {
        PathBuf::from(trimmed)
    }
}

fn read_target(
    role: TargetRole,
    prefix: &str,
    reference_only: bool,
) -> Result<Option<TargetConfig>, anyhow::Error> {
    let Some(kind) = env::var(format!("{}_TYPE", prefix))
        .ok()
        .filter(|k| !k.is_empty())
    else {
        return Ok(None);
    };
    let connection = env::var(format!("{}_URL", prefix)).ok();
    TargetConfig::parse(role, &kind, connection.as_deref(), reference_only).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_s3_connection_string() {
        let target = TargetConfig::parse(
            TargetRole::Destination,
            "s3",
            Some("s3://minio.local:9000/attachments?accessId=AK&accessKey=SK&region=us-east-1&ssl=false"),
            false,
        )
        .unwrap();

        assert_eq!(
            target,
            TargetConfig::AmazonS3(S3TargetConfig {
                endpoint: "minio.local:9000".to_string(),
                bucket: "attachments".to_string(),
                access_id: "AK".to_string(),
                access_key: "SK".to_string(),
                region: "us-east-1".to_string(),
                use_ssl: false,
            })
        );
    }

    #[test]
    fn parse_s3_missing_fields() {
        let err = TargetConfig::parse(
            TargetRole::Destination,
            "s3",
            Some("s3://s3.amazonaws.com/bucket?accessId=AK&region=us-east-1&ssl=true"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("accessKey"));

        let err = TargetConfig::parse(
            TargetRole::Destination,
            "s3",
            Some("s3://s3.amazonaws.com/?accessId=AK&accessKey=SK&region=r&ssl=true"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn parse_google_connection_string() {
        let target = TargetConfig::parse(
            TargetRole::Source,
            "google",
            Some("/etc/keys/gcs.json/attachments"),
            false,
        )
        .unwrap();
        assert_eq!(
            target,
            TargetConfig::GoogleStorage(GoogleStorageTargetConfig {
                service_account_path: PathBuf::from("/etc/keys/gcs.json"),
                bucket: "attachments".to_string(),
            })
        );
    }

    #[test]
    fn gridfs_cannot_be_destination() {
        let err = TargetConfig::parse(TargetRole::Destination, "gridfs", None, false).unwrap_err();
        assert!(err.to_string().contains("destination"));
        assert_eq!(
            TargetConfig::parse(TargetRole::Source, "gridfs", None, false).unwrap(),
            TargetConfig::GridFs
        );
    }

    #[test]
    fn reference_only_source_without_connection() {
        let target = TargetConfig::parse(TargetRole::Source, "s3", None, true).unwrap();
        assert_eq!(target, TargetConfig::Reference(ProviderType::AmazonS3));
        assert_eq!(target.provider_type(), ProviderType::AmazonS3);

        assert!(TargetConfig::parse(TargetRole::Source, "s3", None, false).is_err());
        assert!(TargetConfig::parse(TargetRole::Destination, "s3", None, true).is_err());
    }

    #[test]
    fn filesystem_requires_location() {
        assert!(TargetConfig::parse(TargetRole::Source, "fs", None, true).is_err());
        assert_eq!(
            TargetConfig::parse(TargetRole::Destination, "filesystem", Some("/data/ufs/"), false)
                .unwrap(),
            TargetConfig::FileSystem {
                location: PathBuf::from("/data/ufs")
            }
        );
    }

    #[test]
    fn file_offset_formats() {
        let ts = parse_file_offset("2023-05-01T12:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-05-01T12:30:00+00:00");

        let day = parse_file_offset("2023-05-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2023-05-01T00:00:00+00:00");

        assert!(parse_file_offset("yesterday").is_err());
    }

    #[test]
    fn file_delay_defaults_to_ten_milliseconds() {
        assert_eq!(parse_file_delay(None).unwrap(), Duration::from_millis(10));
        assert_eq!(parse_file_delay(Some("")).unwrap(), Duration::from_millis(10));
        assert_eq!(parse_file_delay(Some("1s")).unwrap(), Duration::from_secs(1));
        assert_eq!(parse_file_delay(Some("250ms")).unwrap(), Duration::from_millis(250));
        assert!(parse_file_delay(Some("soon")).is_err());
    }

    #[test]
    fn scratch_root_trailing_slash_trimmed() {
        assert_eq!(normalize_scratch_root("/tmp/files/"), PathBuf::from("/tmp/files"));
        assert_eq!(normalize_scratch_root(""), PathBuf::from("files"));
    }

    fn base_config() -> MigratorConfig {
        MigratorConfig {
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017/rocketchat".to_string(),
                name: None,
            },
            source: Some(TargetConfig::GridFs),
            destination: None,
            logical_store: LogicalStore::Uploads,
            scratch_root: PathBuf::from("files"),
            skip_errors: false,
            file_delay: Duration::from_millis(DEFAULT_FILE_DELAY_MS),
            file_offset: None,
            debug: false,
        }
    }

    #[test]
    fn validate_requires_a_target() {
        let mut config = base_config();
        assert!(config.validate().is_ok());

        config.source = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_reference_destination() {
        let mut config = base_config();
        config.destination = Some(TargetConfig::Reference(ProviderType::AmazonS3));
        assert!(config.validate().is_err());

        config.destination = Some(TargetConfig::GridFs);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_database() {
        let mut config = base_config();
        config.database.uri.clear();
        assert!(config.validate().is_err());
    }
}
