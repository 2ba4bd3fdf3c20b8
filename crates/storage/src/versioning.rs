//! Component authoring: resolve every prop of a component source and store
//! the outcome as an immutable, content-addressed version.

use std::collections::BTreeMap;
use std::sync::Arc;

use propshape_core::{
    normalize, version_id, ComponentSettingsBlob, InvariantError, PropFieldSettings, PropShape,
    Resolver, ShapeError, StorableShape,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::record::VersionedShapeRecord;
use crate::traits::ShapeStore;

/// Errors raised while creating or loading a component version.
#[derive(Debug, thiserror::Error)]
pub enum VersioningError {
    #[error("prop '{prop}': {source}")]
    Shape {
        prop: String,
        #[source]
        source: ShapeError,
    },

    #[error("prop '{prop}': {source}")]
    Invariant {
        prop: String,
        #[source]
        source: InvariantError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The raw props of a component, as authored: `{ "props": { name: shape } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSource {
    pub props: BTreeMap<String, Value>,
}

impl ComponentSource {
    /// Normalize every prop shape.
    pub fn shapes(&self) -> Result<BTreeMap<String, PropShape>, VersioningError> {
        self.props
            .iter()
            .map(|(prop, raw)| {
                let shape = normalize(raw).map_err(|source| VersioningError::Shape {
                    prop: prop.clone(),
                    source,
                })?;
                Ok((prop.clone(), shape))
            })
            .collect()
    }
}

/// The resolved settings of a component source, before storing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComponent {
    pub shapes: BTreeMap<String, PropShape>,
    pub storables: BTreeMap<String, StorableShape>,
    pub settings: ComponentSettingsBlob,
    pub version_id: String,
}

impl ResolvedComponent {
    /// Props that resolved to no storage mapping and stay unbound.
    pub fn unbound_props(&self) -> impl Iterator<Item = &str> {
        self.shapes
            .keys()
            .filter(|p| !self.storables.contains_key(*p))
            .map(String::as_str)
    }
}

/// Outcome of [`ComponentVersioner::create_version`] and
/// [`ComponentVersioner::store_version`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentVersion {
    pub component_id: String,
    pub version_id: String,
    pub settings: ComponentSettingsBlob,
    /// Records written by this call; zero when the version was already
    /// complete.
    pub records_written: usize,
    /// Whether the version is now the component's active version. A version
    /// with no storable props has no records and cannot become active.
    pub activated: bool,
}

/// Resolves component sources and persists them through a [`ShapeStore`].
pub struct ComponentVersioner<S: ShapeStore> {
    store: Arc<S>,
    resolver: Resolver,
}

impl<S: ShapeStore> ComponentVersioner<S> {
    pub fn new(store: Arc<S>, resolver: Resolver) -> Self {
        ComponentVersioner { store, resolver }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve a component source without touching the store.
    pub fn resolve(&self, source: &ComponentSource) -> Result<ResolvedComponent, VersioningError> {
        let shapes = source.shapes()?;
        let mut storables = BTreeMap::new();
        for (prop, shape) in &shapes {
            let resolved = self
                .resolver
                .resolve(shape)
                .map_err(|source| VersioningError::Invariant {
                    prop: prop.clone(),
                    source,
                })?;
            match resolved {
                Some(storable) => {
                    storables.insert(prop.clone(), storable);
                }
                None => debug!(prop = %prop, "prop has no storable mapping, left unbound"),
            }
        }
        let settings: ComponentSettingsBlob = storables
            .iter()
            .map(|(prop, storable)| (prop.as_str(), storable))
            .collect();
        let version_id = version_id(&shapes, &settings);
        Ok(ResolvedComponent {
            shapes,
            storables,
            settings,
            version_id,
        })
    }

    /// Resolve `source`, store it under its content-derived version id and
    /// make it the active version.
    pub async fn create_version(
        &self,
        component_id: &str,
        source: &ComponentSource,
    ) -> Result<ComponentVersion, VersioningError> {
        let resolved = self.resolve(source)?;
        self.store_version(component_id, resolved).await
    }

    /// Store an already resolved component. Records that exist under the
    /// version are checked against their content and kept; missing ones are
    /// written, so a version left incomplete by a failed call is finished by
    /// the next one. The version is activated once every record is present.
    pub async fn store_version(
        &self,
        component_id: &str,
        resolved: ResolvedComponent,
    ) -> Result<ComponentVersion, VersioningError> {
        let version_id = resolved.version_id.clone();

        let exists = self
            .store
            .list_versions(component_id)
            .await?
            .contains(&version_id);

        let mut records_written = 0;
        for (prop, storable) in &resolved.storables {
            let record = VersionedShapeRecord::new(component_id, prop, &version_id, storable)?;
            if exists && self.store.contains(component_id, prop, &version_id).await? {
                self.check_existing(&record).await?;
                continue;
            }
            match self.store.put(record.clone()).await {
                Ok(()) => records_written += 1,
                // A concurrent author stored the same content first.
                Err(StorageError::DuplicateVersionWrite { .. }) => self.check_existing(&record).await?,
                Err(e) => return Err(e.into()),
            }
        }

        let activated = !resolved.settings.is_empty();
        if activated {
            self.store
                .set_active_version(component_id, &version_id)
                .await?;
        }
        info!(
            component_id,
            version_id = %version_id,
            records_written,
            reused = exists,
            "component version ready"
        );

        Ok(ComponentVersion {
            component_id: component_id.to_owned(),
            version_id,
            settings: resolved.settings,
            records_written,
            activated,
        })
    }

    async fn check_existing(&self, record: &VersionedShapeRecord) -> Result<(), VersioningError> {
        let existing = self
            .store
            .get(&record.component_id, &record.prop_name, &record.version_id)
            .await?;
        if existing.content_hash != record.content_hash {
            return Err(record.key().duplicate().into());
        }
        Ok(())
    }

    /// Read back the settings blob stored for a version.
    pub async fn load_settings(
        &self,
        component_id: &str,
        version_id: &str,
    ) -> Result<ComponentSettingsBlob, VersioningError> {
        let mut blob = ComponentSettingsBlob::new();
        for prop in self.store.list_props(component_id, version_id).await? {
            let record = self.store.get(component_id, &prop, version_id).await?;
            let storable = record.storable()?;
            blob.props.insert(prop, PropFieldSettings::from(&storable));
        }
        Ok(blob)
    }
}
