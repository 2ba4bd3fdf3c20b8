//! Normalized JSON-Schema-like prop shapes.

mod dedup;
mod definitions;
mod normalize;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeError;

pub use dedup::dedup_key;
pub use definitions::{
    is_internal_reference, resolve_refs, DefinitionRegistry, DATE_RANGE_DEFINITION,
    DEFINITION_SCHEME, IMAGE_DEFINITION,
};
pub use normalize::{normalize, INFORMATIONAL_KEYWORDS};

/// The JSON-Schema primitive types a prop shape can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, normalized prop shape.
///
/// Built by [`normalize`]. `schema_type` is only absent for a shape that is
/// a bare `$ref` awaiting [`resolve_refs`]; such a shape keeps the rest of
/// its keywords verbatim in `keywords`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct PropShape {
    pub(crate) schema_type: Option<SchemaType>,
    pub(crate) reference: Option<String>,
    pub(crate) format: Option<String>,
    pub(crate) properties: Option<Vec<(String, PropShape)>>,
    pub(crate) items: Option<Box<PropShape>>,
    /// Every other constraint keyword, sorted by name.
    pub(crate) keywords: BTreeMap<String, Value>,
}

impl PropShape {
    pub fn schema_type(&self) -> Option<SchemaType> {
        self.schema_type
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array)
    }

    /// The `$ref` URI, if any.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Declared object properties, in declaration order.
    pub fn properties(&self) -> Option<&[(String, PropShape)]> {
        self.properties.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&PropShape> {
        self.properties
            .as_ref()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn items(&self) -> Option<&PropShape> {
        self.items.as_deref()
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    pub fn keywords(&self) -> &BTreeMap<String, Value> {
        &self.keywords
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        self.keyword("enum").and_then(Value::as_array).map(Vec::as_slice)
    }

    pub fn content_media_type(&self) -> Option<&str> {
        self.keyword("contentMediaType").and_then(Value::as_str)
    }

    /// Whether this shape still carries a `$ref` whose target has not been
    /// inlined: a `$ref` without a `type`, here or in any nested shape.
    pub fn has_unresolved_ref(&self) -> bool {
        if self.reference.is_some() && self.schema_type.is_none() {
            return true;
        }
        self.properties
            .iter()
            .flatten()
            .any(|(_, s)| s.has_unresolved_ref())
            || self.items.as_ref().is_some_and(|s| s.has_unresolved_ref())
    }

    /// The normalized shape as JSON: `type` first, then every other keyword
    /// sorted by name, declared properties in declaration order.
    pub fn to_value(&self) -> Value {
        let mut entries: BTreeMap<&str, Value> = BTreeMap::new();
        if let Some(r) = &self.reference {
            entries.insert("$ref", Value::String(r.clone()));
        }
        if let Some(f) = &self.format {
            entries.insert("format", Value::String(f.clone()));
        }
        if let Some(props) = &self.properties {
            let mut map = Map::new();
            for (name, shape) in props {
                map.insert(name.clone(), shape.to_value());
            }
            entries.insert("properties", Value::Object(map));
        }
        if let Some(items) = &self.items {
            entries.insert("items", items.to_value());
        }
        for (k, v) in &self.keywords {
            entries.insert(k.as_str(), v.clone());
        }

        let mut out = Map::new();
        if let Some(t) = self.schema_type {
            out.insert("type".to_owned(), Value::String(t.as_str().to_owned()));
        }
        for (k, v) in entries {
            out.insert(k.to_owned(), v);
        }
        Value::Object(out)
    }
}

impl From<PropShape> for Value {
    fn from(shape: PropShape) -> Self {
        shape.to_value()
    }
}

impl TryFrom<Value> for PropShape {
    type Error = ShapeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}
