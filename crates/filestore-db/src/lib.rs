//! Catalog access for the migrator
//!
//! File records live in the platform's `rocketchat_uploads` / `rocketchat_avatars`
//! collections and deployment settings in `rocketchat_settings`. `FileCatalog` is the
//! seam the migrator depends on; `MongoCatalog` implements it on MongoDB.

pub mod catalog;
pub mod documents;
pub mod mongo;
pub mod settings;

pub use catalog::{FileCatalog, FileQuery};
pub use mongo::MongoCatalog;
pub use settings::detect_target;
