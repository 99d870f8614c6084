//! Error types module
//!
//! Every failure a migration run can hit is a `MigrationError`. Variants follow the
//! run's failure taxonomy: a missing source object may be skipped, everything else
//! aborts the run. `ErrorMetadata` lets the CLI decide how to log and exit without
//! matching on variants itself.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions
    Debug,
    /// Warning level - for records skipped during a run
    Warn,
    /// Error level - for failures that abort a run
    Error,
}

/// Step of a migration run, carried by errors so a failure names where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Init,
    Enumerate,
    Fetch,
    Upload,
    Persist,
}

impl Display for MigrationPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            MigrationPhase::Init => "init",
            MigrationPhase::Enumerate => "enumerate",
            MigrationPhase::Fetch => "fetch",
            MigrationPhase::Upload => "upload",
            MigrationPhase::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Metadata describing how an error is reported and whether the run may continue.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether the run may skip the record and continue when `skip_errors` is set
    fn is_skippable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Process exit code when this error ends a run
    fn exit_code(&self) -> i32;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File {file_id} not found in source store: {message}")]
    NotFound { file_id: String, message: String },

    #[error("I/O error during {phase} of file {file_id}: {message}")]
    TransientIo {
        phase: MigrationPhase,
        file_id: String,
        message: String,
    },

    #[error("Failed to record new location of file {file_id} (object already stored at {key}): {message}")]
    Persistence {
        file_id: String,
        key: String,
        message: String,
    },

    #[error("Catalog error during {phase}: {message}")]
    Catalog {
        phase: MigrationPhase,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Static metadata for each variant: (error_code, skippable, suggested_action, exit_code, log_level).
fn migration_error_static_metadata(
    err: &MigrationError,
) -> (&'static str, bool, Option<&'static str>, i32, LogLevel) {
    match err {
        MigrationError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Check the source, destination and database settings"),
            2,
            LogLevel::Error,
        ),
        MigrationError::NotFound { .. } => (
            "NOT_FOUND",
            true,
            Some("Re-run with --skip-errors to skip files missing from the source"),
            3,
            LogLevel::Warn,
        ),
        MigrationError::TransientIo { .. } => (
            "IO_ERROR",
            false,
            Some("Check connectivity to the storage backends and re-run; finished files are not copied again"),
            4,
            LogLevel::Error,
        ),
        MigrationError::Persistence { .. } => (
            "PERSISTENCE_ERROR",
            false,
            Some("Reconcile the named record manually before re-running"),
            5,
            LogLevel::Error,
        ),
        MigrationError::Catalog { .. } => (
            "CATALOG_ERROR",
            false,
            Some("Check the database connection and re-run"),
            6,
            LogLevel::Error,
        ),
        MigrationError::Internal(_) => ("INTERNAL_ERROR", false, None, 1, LogLevel::Error),
    }
}

impl MigrationError {
    /// Get the error type name
    pub fn error_type(&self) -> &str {
        match self {
            MigrationError::Configuration(_) => "Configuration",
            MigrationError::NotFound { .. } => "NotFound",
            MigrationError::TransientIo { .. } => "TransientIo",
            MigrationError::Persistence { .. } => "Persistence",
            MigrationError::Catalog { .. } => "Catalog",
            MigrationError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for MigrationError {
    fn error_code(&self) -> &'static str {
        migration_error_static_metadata(self).0
    }

    fn is_skippable(&self) -> bool {
        migration_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        migration_error_static_metadata(self).2
    }

    fn exit_code(&self) -> i32 {
        migration_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        migration_error_static_metadata(self).4
    }
}
