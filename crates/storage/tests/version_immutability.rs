//! A stored version keeps its resolution after the alteration chain changes.

use std::sync::Arc;

use propshape_core::{
    normalize, AlterRegistry, CandidateStorableShape, DefinitionRegistry, FieldTypeProp, Resolver,
};
use propshape_storage::{
    ComponentSource, ComponentVersioner, MemoryShapeStore, ShapeStore, VersionedShapeRecord,
};
use serde_json::json;

fn link_resolver() -> Resolver {
    let mut registry = AlterRegistry::new();
    registry.register("link_for_uri", |c: &mut CandidateStorableShape| {
        if c.shape().format() == Some("uri") {
            c.field_type_prop = Some(FieldTypeProp::new("link", "url").unwrap().into());
            c.field_widget = Some("link_default".into());
        }
    });
    Resolver::new(DefinitionRegistry::with_builtins(), registry.freeze())
}

#[tokio::test]
async fn registry_swap_leaves_stored_versions_alone() {
    let store = MemoryShapeStore::new();
    let shape = normalize(&json!({ "type": "string", "format": "uri" })).unwrap();

    let before = Resolver::default().resolve(&shape).unwrap().unwrap();
    store
        .put(VersionedShapeRecord::new("c1", "p", "v1", &before).unwrap())
        .await
        .unwrap();
    let v1_before = store.get("c1", "p", "v1").await.unwrap();

    let after = link_resolver().resolve(&shape).unwrap().unwrap();
    store
        .put(VersionedShapeRecord::new("c1", "p", "v2", &after).unwrap())
        .await
        .unwrap();

    let v1 = store.get("c1", "p", "v1").await.unwrap();
    let v2 = store.get("c1", "p", "v2").await.unwrap();
    assert_ne!(v1.snapshot, v2.snapshot);
    assert_ne!(v1.content_hash, v2.content_hash);
    assert_eq!(v1, v1_before);
    assert_eq!(v1.storable().unwrap().field_widget(), "uri");
    assert_eq!(v2.storable().unwrap().field_widget(), "link_default");
}

#[tokio::test]
async fn new_chain_means_new_content_addressed_version() {
    let store = Arc::new(MemoryShapeStore::new());
    let source: ComponentSource = serde_json::from_value(json!({
        "props": { "p": { "type": "string", "format": "uri" } },
    }))
    .unwrap();

    let old = ComponentVersioner::new(store.clone(), Resolver::default());
    let v1 = old.create_version("c1", &source).await.unwrap();

    let new = ComponentVersioner::new(store.clone(), link_resolver());
    let v2 = new.create_version("c1", &source).await.unwrap();

    assert_ne!(v1.version_id, v2.version_id);
    assert_eq!(
        store.list_versions("c1").await.unwrap(),
        [v1.version_id.clone(), v2.version_id.clone()]
    );
    assert_eq!(store.active_version("c1").await.unwrap(), Some(v2.version_id));
    assert_eq!(
        old.load_settings("c1", &v1.version_id).await.unwrap(),
        v1.settings
    );
    assert_eq!(v1.settings.get("p").unwrap().field_widget, "uri");
}
