//! Command-line surface of the file store migrator: argument parsing, flag
//! overrides on top of the environment configuration, logging setup and error
//! reporting.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use filestore_core::config::{normalize_scratch_root, parse_file_delay, parse_file_offset};
use filestore_core::{
    ErrorMetadata, LogLevel, LogicalStore, MigrationError, MigratorConfig, TargetConfig,
    TargetRole,
};

#[derive(Parser, Debug)]
#[command(
    name = "filestore-migrator",
    version,
    about = "Move Rocket.Chat file uploads between storage providers",
    long_about = "Move Rocket.Chat file uploads between storage providers and repoint their \
                  catalog records.\n\nSettings come from the environment (or a .env file); \
                  flags override them. Do not run two migrations of the same store at once."
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Copy every file of the store from the source to the destination
    Migrate,
    /// Download every file of the store into the temp file location
    Download,
    /// Upload previously downloaded files to the destination
    Upload {
        /// Directory holding `<store>/<file id>` files (defaults to the temp file location)
        #[arg(long)]
        files_root: Option<PathBuf>,
    },
}

impl Commands {
    /// Upload runs only need the source's type, not its credentials.
    pub fn reference_only_source(&self) -> bool {
        matches!(self, Commands::Upload { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Migrate => "migrate",
            Commands::Download => "download",
            Commands::Upload { .. } => "upload",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// MongoDB connection string of the Rocket.Chat database
    #[arg(long, global = true)]
    pub database_url: Option<String>,
    /// Database name (defaults to the one in the connection string)
    #[arg(long, global = true)]
    pub database_name: Option<String>,
    /// Source type: gridfs, s3, google, fs
    #[arg(long, global = true)]
    pub source_type: Option<String>,
    /// Source connection string
    #[arg(long, global = true)]
    pub source_url: Option<String>,
    /// Destination type: s3, google, fs
    #[arg(long, global = true)]
    pub destination_type: Option<String>,
    /// Destination connection string
    #[arg(long, global = true)]
    pub destination_url: Option<String>,
    /// Logical store: Uploads or Avatars
    #[arg(long, global = true)]
    pub store: Option<String>,
    /// Directory files are staged in between download and upload
    #[arg(long, global = true)]
    pub temp_file_location: Option<String>,
    /// Skip files missing from the source instead of aborting
    #[arg(long, global = true)]
    pub skip_errors: bool,
    /// Pause between files, e.g. `10ms` or `1s`
    #[arg(long, global = true)]
    pub file_delay: Option<String>,
    /// Only process files uploaded at or after this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, global = true)]
    pub file_offset: Option<String>,
    /// Use the deployment's current storage settings as the source
    #[arg(long, global = true)]
    pub detect_source: bool,
    /// Use the deployment's current storage settings as the destination
    #[arg(long, global = true)]
    pub detect_destination: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn override_target(
    role: TargetRole,
    current: &mut Option<TargetConfig>,
    kind: Option<&str>,
    connection: Option<&str>,
    reference_only: bool,
) -> anyhow::Result<()> {
    let kind = match (kind, current.as_ref()) {
        (Some(kind), _) => kind.to_string(),
        (None, Some(existing)) if connection.is_some() => {
            existing.provider_type().as_str().to_string()
        }
        (None, None) if connection.is_some() => {
            return Err(anyhow::anyhow!(
                "A connection string was given without a {} type",
                match role {
                    TargetRole::Source => "source",
                    TargetRole::Destination => "destination",
                }
            ))
        }
        _ => return Ok(()),
    };

    *current = Some(TargetConfig::parse(role, &kind, connection, reference_only)?);
    Ok(())
}

impl RunArgs {
    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_to(&self, config: &mut MigratorConfig, reference_only: bool) -> anyhow::Result<()> {
        if let Some(url) = &self.database_url {
            config.database.uri = url.clone();
        }
        if let Some(name) = &self.database_name {
            config.database.name = Some(name.clone());
        }

        override_target(
            TargetRole::Source,
            &mut config.source,
            self.source_type.as_deref(),
            self.source_url.as_deref(),
            reference_only,
        )?;
        override_target(
            TargetRole::Destination,
            &mut config.destination,
            self.destination_type.as_deref(),
            self.destination_url.as_deref(),
            reference_only,
        )?;

        if let Some(store) = &self.store {
            config.logical_store = store.parse::<LogicalStore>()?;
        }
        if let Some(location) = &self.temp_file_location {
            config.scratch_root = normalize_scratch_root(location);
        }
        if self.skip_errors {
            config.skip_errors = true;
        }
        if let Some(delay) = &self.file_delay {
            config.file_delay = parse_file_delay(Some(delay))?;
        }
        if let Some(offset) = &self.file_offset {
            config.file_offset = Some(parse_file_offset(offset)?);
        }
        if self.verbose {
            config.debug = true;
        }

        if self.detect_source && self.detect_destination {
            return Err(anyhow::anyhow!(
                "The source and the destination cannot both be detected"
            ));
        }

        Ok(())
    }
}

/// Initialize tracing for the CLI.
pub fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}

/// Log a fatal error at its level and return the process exit code.
pub fn report_error(err: &MigrationError) -> i32 {
    let details = err.to_string();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), "{}", details),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), "{}", details),
        LogLevel::Error => tracing::error!(code = err.error_code(), "{}", details),
    }
    if let Some(action) = err.suggested_action() {
        tracing::info!("{}", action);
    }
    err.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filestore_core::{DatabaseConfig, ProviderType};
    use std::time::Duration;

    fn config() -> MigratorConfig {
        MigratorConfig {
            database: DatabaseConfig {
                uri: "mongodb://env-host/rocketchat".to_string(),
                name: None,
            },
            source: Some(TargetConfig::GridFs),
            destination: None,
            logical_store: LogicalStore::Uploads,
            scratch_root: PathBuf::from("files"),
            skip_errors: false,
            file_delay: Duration::from_millis(10),
            file_offset: None,
            debug: false,
        }
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from([
            "filestore-migrator",
            "upload",
            "--files-root",
            "/srv/files",
            "--store",
            "Avatars",
            "--skip-errors",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Commands::Upload {
                files_root: Some(PathBuf::from("/srv/files"))
            }
        );
        assert!(cli.command.reference_only_source());
        assert!(cli.run.skip_errors);
        assert_eq!(cli.run.store.as_deref(), Some("Avatars"));
    }

    #[test]
    fn flags_override_environment() {
        let args = RunArgs {
            database_url: Some("mongodb://flag-host/rc".to_string()),
            destination_type: Some("fs".to_string()),
            destination_url: Some("/data/ufs/".to_string()),
            store: Some("avatars".to_string()),
            temp_file_location: Some("/tmp/stage/".to_string()),
            file_delay: Some("250ms".to_string()),
            file_offset: Some("2023-05-01".to_string()),
            ..Default::default()
        };

        let mut config = config();
        args.apply_to(&mut config, false).unwrap();

        assert_eq!(config.database.uri, "mongodb://flag-host/rc");
        assert_eq!(
            config.destination,
            Some(TargetConfig::FileSystem {
                location: PathBuf::from("/data/ufs")
            })
        );
        assert_eq!(config.source, Some(TargetConfig::GridFs));
        assert_eq!(config.logical_store, LogicalStore::Avatars);
        assert_eq!(config.scratch_root, PathBuf::from("/tmp/stage"));
        assert_eq!(config.file_delay, Duration::from_millis(250));
        assert!(config.file_offset.is_some());
    }

    #[test]
    fn reference_only_source_for_upload() {
        let args = RunArgs {
            source_type: Some("s3".to_string()),
            ..Default::default()
        };
        let mut config = config();
        args.apply_to(&mut config, true).unwrap();
        assert_eq!(
            config.source,
            Some(TargetConfig::Reference(ProviderType::AmazonS3))
        );

        let mut config = MigratorConfig {
            source: None,
            ..config
        };
        assert!(args.apply_to(&mut config, false).is_err());
    }

    #[test]
    fn detecting_both_targets_is_rejected() {
        let args = RunArgs {
            detect_source: true,
            detect_destination: true,
            ..Default::default()
        };
        assert!(args.apply_to(&mut config(), false).is_err());
    }

    #[test]
    fn exit_code_follows_error() {
        let err = MigrationError::Configuration("missing bucket".to_string());
        assert_eq!(report_error(&err), 2);
    }
}
