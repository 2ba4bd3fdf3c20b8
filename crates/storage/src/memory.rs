//! In-memory `ShapeStore` backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::record::VersionedShapeRecord;
use crate::traits::ShapeStore;

type Triple = (String, String, String);

#[derive(Debug, Default)]
struct Tables {
    /// Serialized records by (component, prop, version).
    records: BTreeMap<Triple, Value>,
    /// Versions per component, in first-write order.
    versions: BTreeMap<String, Vec<String>>,
    active: BTreeMap<String, String>,
}

impl Tables {
    fn has_version(&self, component_id: &str, version_id: &str) -> bool {
        self.versions
            .get(component_id)
            .is_some_and(|vs| vs.iter().any(|v| v == version_id))
    }

    fn version_not_found(component_id: &str, version_id: &str) -> StorageError {
        StorageError::VersionNotFound {
            component_id: component_id.to_owned(),
            version_id: version_id.to_owned(),
        }
    }
}

/// A process-local store. Records are kept serialized, so a read always
/// returns a fresh copy of what was written.
#[derive(Debug, Default)]
pub struct MemoryShapeStore {
    tables: Mutex<Tables>,
}

impl MemoryShapeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn triple(component_id: &str, prop_name: &str, version_id: &str) -> Triple {
    (
        component_id.to_owned(),
        prop_name.to_owned(),
        version_id.to_owned(),
    )
}

#[async_trait]
impl ShapeStore for MemoryShapeStore {
    async fn put(&self, record: VersionedShapeRecord) -> Result<(), StorageError> {
        let serialized = serde_json::to_value(&record)?;
        let key = triple(&record.component_id, &record.prop_name, &record.version_id);

        let mut tables = self.tables.lock().await;
        if tables.records.contains_key(&key) {
            warn!(
                component_id = %record.component_id,
                prop_name = %record.prop_name,
                version_id = %record.version_id,
                "rejected second write to a versioned shape record"
            );
            return Err(record.key().duplicate());
        }
        tables.records.insert(key, serialized);
        let versions = tables
            .versions
            .entry(record.component_id.clone())
            .or_default();
        if !versions.contains(&record.version_id) {
            versions.push(record.version_id.clone());
        }
        debug!(
            component_id = %record.component_id,
            prop_name = %record.prop_name,
            version_id = %record.version_id,
            "stored versioned shape record"
        );
        Ok(())
    }

    async fn get(
        &self,
        component_id: &str,
        prop_name: &str,
        version_id: &str,
    ) -> Result<VersionedShapeRecord, StorageError> {
        let tables = self.tables.lock().await;
        match tables
            .records
            .get(&triple(component_id, prop_name, version_id))
        {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(StorageError::NotFound {
                component_id: component_id.to_owned(),
                prop_name: prop_name.to_owned(),
                version_id: version_id.to_owned(),
            }),
        }
    }

    async fn list_props(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<Vec<String>, StorageError> {
        let tables = self.tables.lock().await;
        if !tables.has_version(component_id, version_id) {
            return Err(Tables::version_not_found(component_id, version_id));
        }
        Ok(tables
            .records
            .keys()
            .filter(|(c, _, v)| c == component_id && v == version_id)
            .map(|(_, p, _)| p.clone())
            .collect())
    }

    async fn list_versions(&self, component_id: &str) -> Result<Vec<String>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .versions
            .get(component_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn active_version(&self, component_id: &str) -> Result<Option<String>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.active.get(component_id).cloned())
    }

    async fn set_active_version(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_version(component_id, version_id) {
            return Err(Tables::version_not_found(component_id, version_id));
        }
        tables
            .active
            .insert(component_id.to_owned(), version_id.to_owned());
        Ok(())
    }

    async fn delete_version(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_version(component_id, version_id) {
            return Err(Tables::version_not_found(component_id, version_id));
        }
        tables
            .records
            .retain(|(c, _, v), _| !(c == component_id && v == version_id));
        if let Some(versions) = tables.versions.get_mut(component_id) {
            versions.retain(|v| v != version_id);
            if versions.is_empty() {
                tables.versions.remove(component_id);
            }
        }
        if tables.active.get(component_id).map(String::as_str) == Some(version_id) {
            tables.active.remove(component_id);
        }
        debug!(component_id, version_id, "deleted component version");
        Ok(())
    }
}
