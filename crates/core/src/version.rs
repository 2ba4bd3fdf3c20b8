//! Content-addressed component versions.
//!
//! A version id is derived from what a component version stores: the dedup
//! key of every prop shape and the settings blob they resolved to. The same
//! props resolving the same way always land on the same version.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::settings::ComponentSettingsBlob;
use crate::shape::{dedup_key, PropShape};

/// Hex characters of the content hash kept in a version id.
pub const VERSION_ID_LEN: usize = 16;

/// Compact JSON with object keys sorted at every level, independent of the
/// insertion order of the value.
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), sorted(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(list) => Value::Array(list.iter().map(sorted).collect()),
        leaf => leaf.clone(),
    }
}

/// SHA-256 of the canonical JSON of `value`, lowercase hex.
pub fn content_hash(value: &Value) -> String {
    let hash = Sha256::digest(canonical_json(value).as_bytes());
    format!("{:x}", hash)
}

/// The id of the component version made of `shapes` and their `settings`.
pub fn version_id(shapes: &BTreeMap<String, PropShape>, settings: &ComponentSettingsBlob) -> String {
    let keys: Map<String, Value> = shapes
        .iter()
        .map(|(prop, shape)| (prop.clone(), Value::String(dedup_key(shape))))
        .collect();
    let mut id = content_hash(&json!({ "shapes": keys, "settings": settings.to_value() }));
    id.truncate(VERSION_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::shape::normalize;

    fn component(props: Value) -> (BTreeMap<String, PropShape>, ComponentSettingsBlob) {
        let resolver = Resolver::default();
        let mut shapes = BTreeMap::new();
        let mut blob = ComponentSettingsBlob::new();
        for (name, raw) in props.as_object().unwrap() {
            let shape = normalize(raw).unwrap();
            if let Some(s) = resolver.resolve(&shape).unwrap() {
                blob.insert(name.clone(), &s);
            }
            shapes.insert(name.clone(), shape);
        }
        (shapes, blob)
    }

    #[test]
    fn canonical_json_ignores_insertion_order() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"d":[{"y":1,"x":2}],"c":null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"c":null,"d":[{"x":2,"y":1}]},"b":1}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&b), r#"{"a":{"c":null,"d":[{"x":2,"y":1}]},"b":1}"#);
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn same_props_same_version() {
        let (s1, b1) = component(json!({ "title": { "type": "string", "title": "Title" } }));
        let (s2, b2) = component(json!({ "title": { "type": "string" } }));
        let id = version_id(&s1, &b1);
        assert_eq!(id.len(), VERSION_ID_LEN);
        assert_eq!(id, version_id(&s2, &b2));
    }

    #[test]
    fn shape_changes_make_a_new_version() {
        let (s1, b1) = component(json!({ "title": { "type": "string" } }));
        let (s2, b2) = component(json!({ "title": { "type": "string", "maxLength": 10 } }));
        assert_ne!(version_id(&s1, &b1), version_id(&s2, &b2));
    }

    #[test]
    fn settings_changes_make_a_new_version() {
        let (shapes, blob) = component(json!({ "tags": { "type": "array", "items": { "type": "string" } } }));
        let mut limited = blob.clone();
        if let Some(tags) = limited.props.get_mut("tags") {
            tags.cardinality = Some(crate::Cardinality::Limited(3));
        }
        assert_ne!(version_id(&shapes, &blob), version_id(&shapes, &limited));
    }

    #[test]
    fn unstorable_props_still_count() {
        let (s1, b1) = component(json!({ "title": { "type": "string" } }));
        let (s2, b2) = component(json!({
            "title": { "type": "string" },
            "extra": { "type": "object", "properties": {} },
        }));
        assert_eq!(b1, b2);
        assert_ne!(version_id(&s1, &b1), version_id(&s2, &b2));
    }
}
