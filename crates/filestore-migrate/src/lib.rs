//! File store migration engine
//!
//! Moves attachment bytes between storage providers and repoints the catalog
//! records at their new home. Three run modes share the same per-record steps:
//!
//! - `migrate_store`: source to destination, catalog updated per record
//! - `download_all`: source to the scratch directory only
//! - `upload_all`: a previously filled scratch directory to the destination

pub mod migrator;
pub mod patch;
pub mod summary;

pub use migrator::{MigrationOptions, Migrator};
pub use patch::build_patch;
pub use summary::MigrationSummary;
