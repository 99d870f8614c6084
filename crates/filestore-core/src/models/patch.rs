//! Catalog patch applied to a record once its bytes are stored at the destination.

use super::file::{LocationField, ObjectLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// New location; `ById` sets no sub-object.
    pub location: ObjectLocation,
    pub url: String,
    pub path: String,
    pub store: String,
    /// Location sub-objects to remove from the record.
    pub unset: Vec<LocationField>,
}

impl FilePatch {
    /// Every location field except the one the new location populates.
    pub fn stale_fields(location: &ObjectLocation) -> Vec<LocationField> {
        LocationField::ALL
            .into_iter()
            .filter(|field| location.field() != Some(*field))
            .collect()
    }
}
