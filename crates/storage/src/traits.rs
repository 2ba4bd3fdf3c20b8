use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::VersionedShapeRecord;

/// The storage trait for versioned storable-shape records.
///
/// ## Write-once records
///
/// A record is identified by `(component_id, prop_name, version_id)`. `put`
/// stores a record at most once: a second write to the same triple, even
/// with identical content, returns `StorageError::DuplicateVersionWrite`.
/// Under concurrent writers exactly one `put` per triple succeeds.
///
/// ## Versions
///
/// A version exists as soon as one record is written under it. Versions are
/// listed in the order of their first write. Records are only ever removed
/// together with their whole version, through `delete_version`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across async
/// task boundaries.
#[async_trait]
pub trait ShapeStore: Send + Sync + 'static {
    // ── Records ──────────────────────────────────────────────────────────────

    /// Store a new record.
    ///
    /// Returns `Err(StorageError::DuplicateVersionWrite)` if the triple exists.
    async fn put(&self, record: VersionedShapeRecord) -> Result<(), StorageError>;

    /// Read a record.
    ///
    /// Returns `Err(StorageError::NotFound)` if the triple does not exist.
    async fn get(
        &self,
        component_id: &str,
        prop_name: &str,
        version_id: &str,
    ) -> Result<VersionedShapeRecord, StorageError>;

    /// Prop names stored under a version, sorted.
    ///
    /// Returns `Err(StorageError::VersionNotFound)` for an unknown version.
    async fn list_props(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<Vec<String>, StorageError>;

    // ── Versions ─────────────────────────────────────────────────────────────

    /// Versions of a component, in first-write order. Empty for an unknown
    /// component.
    async fn list_versions(&self, component_id: &str) -> Result<Vec<String>, StorageError>;

    /// The active version of a component, if one was set.
    async fn active_version(&self, component_id: &str) -> Result<Option<String>, StorageError>;

    /// Point the component at one of its versions.
    ///
    /// Returns `Err(StorageError::VersionNotFound)` for an unknown version.
    async fn set_active_version(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<(), StorageError>;

    /// Remove a version and all its records. Clears the active version if it
    /// pointed there.
    ///
    /// Returns `Err(StorageError::VersionNotFound)` for an unknown version.
    async fn delete_version(&self, component_id: &str, version_id: &str)
        -> Result<(), StorageError>;

    // ── Provided ─────────────────────────────────────────────────────────────

    /// Whether a record exists for the triple.
    async fn contains(
        &self,
        component_id: &str,
        prop_name: &str,
        version_id: &str,
    ) -> Result<bool, StorageError> {
        match self.get(component_id, prop_name, version_id).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
