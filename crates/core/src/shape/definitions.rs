//! Named shape definitions and `$ref` inlining.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::{normalize, PropShape};
use crate::error::ShapeError;

/// URI scheme of definitions this engine can inline:
/// `json-schema-definitions://{provider}/{name}`.
pub const DEFINITION_SCHEME: &str = "json-schema-definitions://";

pub const IMAGE_DEFINITION: &str = "json-schema-definitions://propshape/image";
pub const DATE_RANGE_DEFINITION: &str = "json-schema-definitions://propshape/date-range";

pub fn is_internal_reference(uri: &str) -> bool {
    uri.strip_prefix(DEFINITION_SCHEME)
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(provider, name)| {
            !provider.is_empty() && !name.is_empty() && !name.contains('/')
        })
}

/// Registered definition bodies, keyed by their internal `$ref` URI.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: BTreeMap<String, Value>,
}

impl DefinitionRegistry {
    /// An empty registry; see [`DefinitionRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut definitions = BTreeMap::new();
        definitions.insert(
            IMAGE_DEFINITION.to_owned(),
            json!({
                "type": "object",
                "required": ["src"],
                "properties": {
                    "src": {
                        "type": "string",
                        "format": "uri-reference",
                        "contentMediaType": "image/*",
                    },
                    "alt": { "type": "string" },
                    "width": { "type": "integer" },
                    "height": { "type": "integer" },
                },
            }),
        );
        definitions.insert(
            DATE_RANGE_DEFINITION.to_owned(),
            json!({
                "type": "object",
                "required": ["from"],
                "properties": {
                    "from": { "type": "string", "format": "date" },
                    "to": { "type": "string", "format": "date" },
                },
            }),
        );
        DefinitionRegistry { definitions }
    }

    /// Register (or replace) a definition. The body must itself be a valid
    /// raw shape.
    pub fn register(&mut self, uri: impl Into<String>, body: Value) -> Result<(), ShapeError> {
        let uri = uri.into();
        if !is_internal_reference(&uri) {
            return Err(ShapeError::InvalidKeyword {
                path: "#".to_owned(),
                keyword: "$ref".to_owned(),
                detail: format!("'{}' is not a {}{{provider}}/{{name}} URI", uri, DEFINITION_SCHEME),
            });
        }
        normalize(&body)?;
        self.definitions.insert(uri, body);
        Ok(())
    }

    pub fn get(&self, uri: &str) -> Option<&Value> {
        self.definitions.get(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.definitions.contains_key(uri)
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

/// Inline every internal `$ref` of `shape` with its definition body.
///
/// Only references present in `shape` itself are inlined. References that
/// appear inside an inlined body are left as they are, so cyclic definitions
/// terminate after one level instead of being detected. Keywords next to a
/// `$ref` override the body's; `properties` are merged per name. The `$ref`
/// itself stays on the inlined shape as its name.
pub fn resolve_refs(
    shape: &PropShape,
    definitions: &DefinitionRegistry,
) -> Result<PropShape, ShapeError> {
    let mut node = shape.clone();
    if let Some(props) = &mut node.properties {
        for (_, sub) in props.iter_mut() {
            *sub = resolve_refs(sub, definitions)?;
        }
    }
    if let Some(items) = &mut node.items {
        **items = resolve_refs(items, definitions)?;
    }

    let Some(uri) = node.reference.clone() else {
        return Ok(node);
    };
    let body = definitions
        .get(&uri)
        .filter(|_| is_internal_reference(&uri))
        .ok_or_else(|| ShapeError::UnknownReferenceTarget { uri: uri.clone() })?;

    let mut merged = match body {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let Value::Object(own) = node.to_value() else {
        return Ok(node);
    };
    for (key, value) in own {
        if key == "properties" {
            if let (Some(Value::Object(body_props)), Value::Object(own_props)) =
                (merged.get_mut("properties"), &value)
            {
                for (name, sub) in own_props {
                    body_props.insert(name.clone(), sub.clone());
                }
                continue;
            }
        }
        merged.insert(key, value);
    }
    normalize(&Value::Object(merged))
}
