//! Domain models
//!
//! File records and their locations, the catalog patches written after a copy, and
//! deployment-wide settings.

pub mod file;
pub mod patch;
pub mod settings;

pub use file::{FileRecord, LocationField, LogicalStore, ObjectLocation, StoreLabel};
pub use patch::FilePatch;
pub use settings::DeploymentSettings;
