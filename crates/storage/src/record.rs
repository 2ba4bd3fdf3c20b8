use propshape_core::{content_hash, StorableShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StorageError;

/// The resolved storage mapping of one prop in one component version.
///
/// The storable shape is kept as its serialized snapshot, never as a live
/// value, so nothing done to the resolver after the write can change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedShapeRecord {
    pub component_id: String,
    pub prop_name: String,
    pub version_id: String,
    /// Serialized `StorableShape`.
    pub snapshot: Value,
    /// SHA-256 of the canonical snapshot JSON.
    pub content_hash: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl VersionedShapeRecord {
    pub fn new(
        component_id: impl Into<String>,
        prop_name: impl Into<String>,
        version_id: impl Into<String>,
        storable: &StorableShape,
    ) -> Result<Self, StorageError> {
        let snapshot = serde_json::to_value(storable)?;
        Ok(VersionedShapeRecord {
            component_id: component_id.into(),
            prop_name: prop_name.into(),
            version_id: version_id.into(),
            content_hash: content_hash(&snapshot),
            snapshot,
            created_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
    }

    /// Deserialize the snapshot, re-checking the storable shape invariants.
    pub fn storable(&self) -> Result<StorableShape, StorageError> {
        Ok(serde_json::from_value(self.snapshot.clone())?)
    }

    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            component_id: &self.component_id,
            prop_name: &self.prop_name,
            version_id: &self.version_id,
        }
    }
}

/// Borrowed (component, prop, version) triple identifying a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey<'a> {
    pub component_id: &'a str,
    pub prop_name: &'a str,
    pub version_id: &'a str,
}

impl RecordKey<'_> {
    pub fn not_found(&self) -> StorageError {
        StorageError::NotFound {
            component_id: self.component_id.to_owned(),
            prop_name: self.prop_name.to_owned(),
            version_id: self.version_id.to_owned(),
        }
    }

    pub fn duplicate(&self) -> StorageError {
        StorageError::DuplicateVersionWrite {
            component_id: self.component_id.to_owned(),
            prop_name: self.prop_name.to_owned(),
            version_id: self.version_id.to_owned(),
        }
    }
}
