//! filestore-migrator: move Rocket.Chat file uploads between storage providers.
//!
//! Configuration comes from DATABASE_URL, SOURCE_TYPE/SOURCE_URL,
//! DESTINATION_TYPE/DESTINATION_URL, STORE, TEMP_FILE_LOCATION, SKIP_ERRORS,
//! FILE_DELAY and FILE_OFFSET (or a .env file); flags override them.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use filestore_cli::{init_tracing, report_error, Cli, Commands};
use filestore_core::{MigrationError, MigrationResult, MigratorConfig, TargetConfig, TargetRole};
use filestore_db::MongoCatalog;
use filestore_migrate::{MigrationOptions, MigrationSummary, Migrator};
use filestore_storage::{create_provider, StorageProvider};

fn configuration(err: impl std::fmt::Display) -> MigrationError {
    MigrationError::Configuration(err.to_string())
}

async fn provider(
    target: Option<&TargetConfig>,
    role: TargetRole,
    catalog: &MongoCatalog,
) -> MigrationResult<Option<Box<dyn StorageProvider>>> {
    match target {
        Some(target) => create_provider(target, role, Some(catalog.database()))
            .await
            .map_err(configuration),
        None => Ok(None),
    }
}

async fn run(cli: &Cli, mut config: MigratorConfig) -> MigrationResult<MigrationSummary> {
    let catalog = MongoCatalog::connect(&config.database).await?;

    if cli.run.detect_source {
        config.source = Some(catalog.detect_target().await?);
    }
    if cli.run.detect_destination {
        config.destination = Some(catalog.detect_target().await?);
    }
    config.validate().map_err(configuration)?;

    let source = provider(config.source.as_ref(), TargetRole::Source, &catalog).await?;
    let destination =
        provider(config.destination.as_ref(), TargetRole::Destination, &catalog).await?;

    let options = MigrationOptions::from_config(&config);
    let migrator = Migrator::new(source, destination, Arc::new(catalog), options).await?;

    match &cli.command {
        Commands::Migrate => migrator.migrate_store().await,
        Commands::Download => migrator.download_all().await,
        Commands::Upload { files_root } => migrator.upload_all(files_root.clone()).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = MigratorConfig::from_env(cli.command.reference_only_source());
    let debug = cli.run.verbose || loaded.as_ref().is_ok_and(|c| c.debug);
    init_tracing(debug, cli.run.log_format);

    let config = loaded.and_then(|mut config| {
        cli.run
            .apply_to(&mut config, cli.command.reference_only_source())
            .map(|_| config)
    });
    let config = match config {
        Ok(config) => config,
        Err(e) => return ExitCode::from(report_error(&configuration(e)) as u8),
    };

    tracing::info!(
        command = cli.command.name(),
        store = %config.logical_store,
        "Starting file store migration"
    );

    match run(&cli, config).await {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => ExitCode::from(report_error(&MigrationError::Internal(e.to_string())) as u8),
        },
        Err(e) => ExitCode::from(report_error(&e) as u8),
    }
}
