//! Shared key generation for storage providers.
//!
//! Keys follow the platform's own upload paths so migrated objects sit where the
//! platform would have written them:
//! `{unique_id}/uploads/{room_id}/{user_id}/{file_id}`, `{unique_id}/avatars/{user_id}`
//! and `{unique_id}/avatars/room-{room_id}`. Flat-keyed providers use the file ID.

use filestore_core::{FileRecord, KeyLayout, LogicalStore, ProviderType};

/// Stand-in for an empty room or user ID in upload paths.
pub const UNDEFINED_SEGMENT: &str = "undefined";

fn segment(value: &str) -> &str {
    if value.is_empty() {
        UNDEFINED_SEGMENT
    } else {
        value
    }
}

/// Compute the destination object key of a file record.
///
/// Pure: the record is never modified, empty IDs are only substituted in the key.
pub fn resolve_object_key(
    store: LogicalStore,
    layout: KeyLayout,
    unique_id: &str,
    file: &FileRecord,
) -> String {
    if layout == KeyLayout::Flat {
        return file.id.clone();
    }

    match store {
        LogicalStore::Uploads => format!(
            "{}/{}/{}/{}/{}",
            unique_id,
            store.dir_name(),
            segment(&file.room_id),
            segment(&file.user_id),
            file.id
        ),
        LogicalStore::Avatars if file.is_room_avatar(store) => {
            format!("{}/{}/room-{}", unique_id, store.dir_name(), file.room_id)
        }
        LogicalStore::Avatars => format!("{}/{}/{}", unique_id, store.dir_name(), file.user_id),
    }
}

/// Browser-facing `/ufs/{provider}:{store}/{file_id}/{name}` path of a record.
pub fn ufs_path(provider: ProviderType, store: LogicalStore, file: &FileRecord) -> String {
    format!("/ufs/{}:{}/{}/{}", provider, store, file.id, file.name)
}
