//! The persisted per-version settings blob.
//!
//! A component version stores, for each of its props, the storage mapping
//! its shape resolved to. The field type prop is kept as its canonical
//! expression string, so the blob is plain JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GrammarError, SettingsError};
use crate::expression::{self, Expression};
use crate::resolver::{Cardinality, FieldSettings, Resolver, StorableShape};
use crate::shape::PropShape;

/// How one prop is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropFieldSettings {
    pub field_type_prop: String,
    pub field_widget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_storage_settings: Option<FieldSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_instance_settings: Option<FieldSettings>,
}

impl PropFieldSettings {
    /// The persisted JSON form, the same value serde writes.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("field_type_prop".into(), Value::from(self.field_type_prop.as_str()));
        out.insert("field_widget".into(), Value::from(self.field_widget.as_str()));
        if let Some(c) = self.cardinality {
            out.insert("cardinality".into(), c.to_value());
        }
        if let Some(s) = &self.field_storage_settings {
            out.insert("field_storage_settings".into(), settings_value(s));
        }
        if let Some(s) = &self.field_instance_settings {
            out.insert("field_instance_settings".into(), settings_value(s));
        }
        Value::Object(out)
    }

    /// Parse the stored field type prop.
    pub fn expression(&self) -> Result<Expression, GrammarError> {
        expression::parse(&self.field_type_prop)
    }

    /// Rebuild the storable shape this entry was produced from, given the
    /// prop's shape. `resolver` inlines bare `$ref`s the same way resolution
    /// did, so the invariants are checked against the same structure.
    pub fn to_storable(
        &self,
        prop: &str,
        shape: PropShape,
        resolver: &Resolver,
    ) -> Result<StorableShape, SettingsError> {
        let expression = self.expression().map_err(|source| SettingsError::Expression {
            prop: prop.to_owned(),
            source,
        })?;
        let structure = resolver.structure(&shape);
        StorableShape::from_parts(
            shape,
            Some(structure),
            expression,
            self.field_widget.clone(),
            self.cardinality,
            self.field_storage_settings.clone(),
            self.field_instance_settings.clone(),
        )
        .map_err(|source| SettingsError::Invariant {
            prop: prop.to_owned(),
            source,
        })
    }
}

fn settings_value(settings: &FieldSettings) -> Value {
    Value::Object(settings.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

impl From<&StorableShape> for PropFieldSettings {
    fn from(s: &StorableShape) -> Self {
        PropFieldSettings {
            field_type_prop: s.field_type_prop().to_string(),
            field_widget: s.field_widget().to_owned(),
            cardinality: s.cardinality(),
            field_storage_settings: s.field_storage_settings().cloned(),
            field_instance_settings: s.field_instance_settings().cloned(),
        }
    }
}

/// The settings of every storable prop of one component version, by prop
/// name. Props that resolved to no mapping are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSettingsBlob {
    pub props: BTreeMap<String, PropFieldSettings>,
}

impl ComponentSettingsBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prop: impl Into<String>, storable: &StorableShape) {
        self.props.insert(prop.into(), PropFieldSettings::from(storable));
    }

    pub fn get(&self, prop: &str) -> Option<&PropFieldSettings> {
        self.props.get(prop)
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// The persisted JSON form of the whole blob.
    pub fn to_value(&self) -> Value {
        let props: Map<String, Value> = self
            .props
            .iter()
            .map(|(prop, settings)| (prop.clone(), settings.to_value()))
            .collect();
        let mut out = Map::new();
        out.insert("props".into(), Value::Object(props));
        Value::Object(out)
    }

    /// Rebuild every stored prop against the component's shapes.
    pub fn to_storable_shapes(
        &self,
        shapes: &BTreeMap<String, PropShape>,
        resolver: &Resolver,
    ) -> Result<BTreeMap<String, StorableShape>, SettingsError> {
        self.props
            .iter()
            .map(|(prop, settings)| {
                let shape = shapes
                    .get(prop)
                    .cloned()
                    .ok_or_else(|| SettingsError::UnknownProp { prop: prop.clone() })?;
                Ok((prop.clone(), settings.to_storable(prop, shape, resolver)?))
            })
            .collect()
    }
}

impl<'a> FromIterator<(&'a str, &'a StorableShape)> for ComponentSettingsBlob {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a StorableShape)>>(iter: I) -> Self {
        let mut blob = ComponentSettingsBlob::new();
        for (prop, storable) in iter {
            blob.insert(prop, storable);
        }
        blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{normalize, DefinitionRegistry};
    use crate::AlterChain;
    use serde_json::json;

    fn storable(raw: serde_json::Value) -> (PropShape, StorableShape) {
        let shape = normalize(&raw).unwrap();
        let s = Resolver::default().resolve(&shape).unwrap().unwrap();
        (shape, s)
    }

    #[test]
    fn blob_is_plain_json() {
        let (_, tags) = storable(json!({ "type": "array", "items": { "type": "string" } }));
        let (_, link) = storable(json!({ "type": "string", "format": "uri-reference" }));
        let blob: ComponentSettingsBlob = [("tags", &tags), ("link", &link)].into_iter().collect();

        assert_eq!(
            serde_json::to_value(&blob).unwrap(),
            json!({
                "props": {
                    "link": {
                        "field_type_prop": "ℹ︎link␟uri",
                        "field_widget": "link_default",
                        "field_instance_settings": { "title": "disabled" },
                    },
                    "tags": {
                        "field_type_prop": "ℹ︎string␟value",
                        "field_widget": "string_textfield",
                        "cardinality": "unlimited",
                    },
                },
            })
        );
    }

    #[test]
    fn blob_value_matches_what_serde_writes() {
        let (_, tags) = storable(json!({ "type": "array", "items": { "type": "string" } }));
        let (_, link) = storable(json!({ "type": "string", "format": "uri-reference" }));
        let (_, image) = storable(json!({ "$ref": crate::shape::IMAGE_DEFINITION }));
        let mut blob: ComponentSettingsBlob =
            [("tags", &tags), ("link", &link), ("image", &image)].into_iter().collect();
        let mut pair = PropFieldSettings::from(&tags);
        pair.cardinality = Some(Cardinality::Limited(2));
        pair.field_storage_settings = Some(FieldSettings::from([("max_length".into(), json!(80))]));
        blob.props.insert("pair".into(), pair);

        assert_eq!(blob.to_value(), serde_json::to_value(&blob).unwrap());
        assert_eq!(blob.to_value()["props"]["pair"]["cardinality"], 2);
        assert_eq!(ComponentSettingsBlob::new().to_value(), json!({ "props": {} }));
    }

    #[test]
    fn entries_rebuild_their_storable_shape() {
        let (shape, link) = storable(json!({ "type": "string", "format": "uri-reference" }));
        let settings = PropFieldSettings::from(&link);
        assert_eq!(settings.to_storable("link", shape, &Resolver::default()).unwrap(), link);
    }

    #[test]
    fn corrupt_expressions_surface_as_grammar_errors() {
        let (shape, link) = storable(json!({ "type": "string", "format": "uri" }));
        let mut settings = PropFieldSettings::from(&link);
        settings.field_type_prop = "uri␟value".into();
        assert!(matches!(
            settings.to_storable("link", shape, &Resolver::default()),
            Err(SettingsError::Expression { ref prop, .. }) if prop == "link"
        ));
    }

    #[test]
    fn rebuilding_rechecks_invariants() {
        let (shape, s) = storable(json!({ "type": "string" }));
        let mut settings = PropFieldSettings::from(&s);
        settings.cardinality = Some(Cardinality::Limited(3));
        assert!(matches!(
            settings.to_storable("title", shape, &Resolver::default()),
            Err(SettingsError::Invariant { .. })
        ));
    }

    #[test]
    fn blob_needs_a_shape_per_prop() {
        let (_, s) = storable(json!({ "type": "boolean" }));
        let blob: ComponentSettingsBlob = [("flag", &s)].into_iter().collect();
        assert_eq!(
            blob.to_storable_shapes(&BTreeMap::new(), &Resolver::default()),
            Err(SettingsError::UnknownProp { prop: "flag".into() })
        );
    }

    #[test]
    fn referenced_lists_rebuild_against_their_definition() {
        let mut definitions = DefinitionRegistry::with_builtins();
        definitions
            .register(
                "json-schema-definitions://acme/tags",
                json!({ "type": "array", "items": { "type": "string" } }),
            )
            .unwrap();
        let resolver = Resolver::new(definitions, AlterChain::empty());
        let shape = normalize(&json!({ "$ref": "json-schema-definitions://acme/tags" })).unwrap();
        let tags = resolver.resolve(&shape).unwrap().unwrap();
        assert_eq!(tags.cardinality(), Some(Cardinality::Unlimited));

        let blob: ComponentSettingsBlob = [("tags", &tags)].into_iter().collect();
        let shapes = BTreeMap::from([("tags".to_owned(), shape)]);
        let rebuilt = blob.to_storable_shapes(&shapes, &resolver).unwrap();
        assert_eq!(rebuilt["tags"], tags);
    }
}
