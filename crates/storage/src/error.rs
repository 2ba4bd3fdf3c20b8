/// All errors that can be returned by a `ShapeStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A record for this (component, prop, version) triple already exists.
    /// Records are write-once; this is never retried.
    #[error("record {component_id}/{prop_name}@{version_id} already exists")]
    DuplicateVersionWrite {
        component_id: String,
        prop_name: String,
        version_id: String,
    },

    /// No record with the given (component, prop, version) triple.
    #[error("record not found: {component_id}/{prop_name}@{version_id}")]
    NotFound {
        component_id: String,
        prop_name: String,
        version_id: String,
    },

    /// The component has no records under this version.
    #[error("version not found: {component_id}@{version_id}")]
    VersionNotFound {
        component_id: String,
        version_id: String,
    },

    /// A stored snapshot could not be (de)serialized.
    #[error("snapshot serialization error: {0}")]
    Serialization(String),

    /// A backend-specific storage error (connection, lock, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
