//! Filestore Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every filestore-migrator component: file records and their locations, logical
//! stores, provider types, and the resolved migration configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{DatabaseConfig, MigratorConfig, TargetConfig, TargetRole};
pub use error::{ErrorMetadata, LogLevel, MigrationError, MigrationPhase, MigrationResult};
pub use models::{
    DeploymentSettings, FilePatch, FileRecord, LocationField, LogicalStore, ObjectLocation,
    StoreLabel,
};
pub use storage_types::{KeyLayout, ProviderType};
