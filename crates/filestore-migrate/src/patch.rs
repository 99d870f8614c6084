use filestore_core::{
    DeploymentSettings, FilePatch, FileRecord, LogicalStore, ObjectLocation, ProviderType,
    StoreLabel,
};
use filestore_storage::ufs_path;

/// Catalog patch recording that `file` now lives at `key` in `destination`.
///
/// Every location sub-object other than the destination's is unset, so a migrated
/// record carries exactly one location.
pub fn build_patch(
    destination: ProviderType,
    store: LogicalStore,
    settings: &DeploymentSettings,
    file: &FileRecord,
    key: &str,
) -> FilePatch {
    let location = ObjectLocation::for_destination(destination, key);
    let path = ufs_path(destination, store, file);

    FilePatch {
        unset: FilePatch::stale_fields(&location),
        location,
        url: settings.absolute_url(&path),
        path,
        store: StoreLabel::new(destination, store).to_string(),
    }
}
