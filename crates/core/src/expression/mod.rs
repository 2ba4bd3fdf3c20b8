//! Prop expressions: typed, string-serializable references into structured
//! data or into another component instance's props.
//!
//! Every [`Expression`] has exactly one canonical string form (its
//! [`Display`](std::fmt::Display) output) and [`parse`] of that string
//! reconstructs an equal value. The parts of an expression can only be
//! built through checked constructors, so no value exists whose string form
//! would not parse back to it.

mod parser;
mod serialize;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::GrammarError;
use crate::lexer;

pub use parser::parse;
pub use serialize::serialize;

/// Check that `value` can stand as one name of an expression. Entity types
/// and bundles are checked separately, since `:` joins them.
fn check_name(part: &'static str, value: &str) -> Result<(), GrammarError> {
    let reason = if value.is_empty() {
        "names may not be empty"
    } else if value.contains(':') {
        "':' only separates entity type and bundle"
    } else if !value.chars().all(lexer::is_name_char) {
        "names may only contain ASCII letters, digits, '_', '.' and '-'"
    } else {
        return Ok(());
    };
    Err(GrammarError::InvalidName {
        part,
        value: value.to_owned(),
        reason,
    })
}

/// A property of a storage field type instance, e.g. `ℹ︎link␟url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldTypeProp {
    field_type: String,
    prop_name: String,
}

impl FieldTypeProp {
    pub fn new(
        field_type: impl Into<String>,
        prop_name: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let e = FieldTypeProp {
            field_type: field_type.into(),
            prop_name: prop_name.into(),
        };
        check_name("field type", &e.field_type)?;
        check_name("field type property name", &e.prop_name)?;
        Ok(e)
    }

    /// For names fixed in this crate's builtin rules.
    pub(crate) fn builtin(field_type: &'static str, prop_name: &'static str) -> Self {
        FieldTypeProp {
            field_type: field_type.to_owned(),
            prop_name: prop_name.to_owned(),
        }
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn prop_name(&self) -> &str {
        &self.prop_name
    }
}

/// The field on a referenced entity that a reference chain lands on.
///
/// Written `{entity_type}[:{bundle}]␝{field_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferencedField {
    entity_type: String,
    bundle: Option<String>,
    field_name: String,
}

impl ReferencedField {
    pub fn new(
        entity_type: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let r = ReferencedField {
            entity_type: entity_type.into(),
            bundle: None,
            field_name: field_name.into(),
        };
        check_name("entity type", &r.entity_type)?;
        check_name("referenced field name", &r.field_name)?;
        Ok(r)
    }

    pub(crate) fn builtin(entity_type: &'static str, field_name: &'static str) -> Self {
        ReferencedField {
            entity_type: entity_type.to_owned(),
            bundle: None,
            field_name: field_name.to_owned(),
        }
    }

    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Result<Self, GrammarError> {
        let bundle = bundle.into();
        check_name("bundle", &bundle)?;
        self.bundle = Some(bundle);
        Ok(self)
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn bundle(&self) -> Option<&str> {
        self.bundle.as_deref()
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

/// Follows an entity reference field item into a property of the
/// referenced entity, e.g. `ℹ︎image␟entity␜␜file␝uri␞␟url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceFieldTypeProp {
    base: FieldTypeProp,
    referenced: ReferencedField,
    referenced_prop_name: String,
}

impl ReferenceFieldTypeProp {
    pub fn new(
        base: FieldTypeProp,
        referenced: ReferencedField,
        referenced_prop_name: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let referenced_prop_name = referenced_prop_name.into();
        check_name("referenced property name", &referenced_prop_name)?;
        Ok(ReferenceFieldTypeProp {
            base,
            referenced,
            referenced_prop_name,
        })
    }

    pub fn base(&self) -> &FieldTypeProp {
        &self.base
    }

    pub fn referenced(&self) -> &ReferencedField {
        &self.referenced
    }

    pub fn referenced_prop_name(&self) -> &str {
        &self.referenced_prop_name
    }

    /// The `{entity_type}[:{bundle}]␝{field_name}` path of the referenced field.
    pub fn referenced_prop_path(&self) -> String {
        let mut out = String::new();
        serialize::write_referenced_field(&mut out, &self.referenced);
        out
    }
}

/// Where one sub-property of a JSON-Schema object gets its value from.
///
/// Names are checked when the target joins a [`FieldTypeObjectProps`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectPropTarget {
    /// `source↠prop`: a property of the same field item.
    Prop(String),
    /// `source↝prop␜␜entity␝field␞␟prop`: a property of the entity that the
    /// field item references.
    FollowReference {
        prop_name: String,
        referenced: ReferencedField,
        referenced_prop_name: String,
    },
}

impl ObjectPropTarget {
    fn check(&self) -> Result<(), GrammarError> {
        match self {
            ObjectPropTarget::Prop(prop) => check_name("field type property name", prop),
            ObjectPropTarget::FollowReference {
                prop_name,
                referenced_prop_name,
                ..
            } => {
                check_name("field type property name", prop_name)?;
                check_name("referenced property name", referenced_prop_name)
            }
        }
    }
}

/// Maps each named sub-property of an object-shaped prop to a field type
/// property, e.g. `ℹ︎daterange␟{from↠value,to↠end_value}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldTypeObjectProps {
    field_type: String,
    /// Declaration order is significant and preserved.
    prop_map: Vec<(String, ObjectPropTarget)>,
}

impl FieldTypeObjectProps {
    /// At least one mapping is required, and each source prop maps once.
    pub fn new(
        field_type: impl Into<String>,
        prop_map: impl IntoIterator<Item = (String, ObjectPropTarget)>,
    ) -> Result<Self, GrammarError> {
        let e = FieldTypeObjectProps {
            field_type: field_type.into(),
            prop_map: prop_map.into_iter().collect(),
        };
        check_name("field type", &e.field_type)?;
        if e.prop_map.is_empty() {
            return Err(GrammarError::InvalidName {
                part: "object property map",
                value: String::new(),
                reason: "at least one object property must be mapped",
            });
        }
        for (i, (source, target)) in e.prop_map.iter().enumerate() {
            check_name("object property name", source)?;
            if e.prop_map[..i].iter().any(|(earlier, _)| earlier == source) {
                return Err(GrammarError::InvalidName {
                    part: "object property name",
                    value: source.clone(),
                    reason: "each object property may be mapped once",
                });
            }
            target.check()?;
        }
        Ok(e)
    }

    pub(crate) fn builtin(
        field_type: &'static str,
        prop_map: Vec<(&'static str, ObjectPropTarget)>,
    ) -> Self {
        FieldTypeObjectProps {
            field_type: field_type.to_owned(),
            prop_map: prop_map
                .into_iter()
                .map(|(source, target)| (source.to_owned(), target))
                .collect(),
        }
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn prop_map(&self) -> &[(String, ObjectPropTarget)] {
        &self.prop_map
    }

    pub fn target(&self, source_prop: &str) -> Option<&ObjectPropTarget> {
        self.prop_map
            .iter()
            .find(|(name, _)| name == source_prop)
            .map(|(_, target)| target)
    }
}

/// The field item level of a [`StructuredDataProp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldItemPath {
    field_name: String,
    /// `None` addresses every item of the field.
    delta: Option<u32>,
    prop_name: Option<String>,
}

impl FieldItemPath {
    pub fn new(field_name: impl Into<String>) -> Result<Self, GrammarError> {
        let field_name = field_name.into();
        check_name("field name", &field_name)?;
        Ok(FieldItemPath {
            field_name,
            delta: None,
            prop_name: None,
        })
    }

    pub fn with_delta(mut self, delta: u32) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn with_prop_name(mut self, prop_name: impl Into<String>) -> Result<Self, GrammarError> {
        let prop_name = prop_name.into();
        check_name("field item property name", &prop_name)?;
        self.prop_name = Some(prop_name);
        Ok(self)
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn delta(&self) -> Option<u32> {
        self.delta
    }

    pub fn prop_name(&self) -> Option<&str> {
        self.prop_name.as_deref()
    }
}

/// An absolute path into an entity's field / item / property hierarchy,
/// e.g. `ℹ︎␜node:article␝title␞0␟value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuredDataProp {
    entity_type: String,
    bundle: Option<String>,
    field: Option<FieldItemPath>,
}

impl StructuredDataProp {
    pub fn new(entity_type: impl Into<String>) -> Result<Self, GrammarError> {
        let entity_type = entity_type.into();
        check_name("entity type", &entity_type)?;
        Ok(StructuredDataProp {
            entity_type,
            bundle: None,
            field: None,
        })
    }

    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Result<Self, GrammarError> {
        let bundle = bundle.into();
        check_name("bundle", &bundle)?;
        self.bundle = Some(bundle);
        Ok(self)
    }

    pub fn with_field(mut self, field: FieldItemPath) -> Self {
        self.field = Some(field);
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn bundle(&self) -> Option<&str> {
        self.bundle.as_deref()
    }

    pub fn field(&self) -> Option<&FieldItemPath> {
        self.field.as_ref()
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field.as_ref().map(|f| f.field_name.as_str())
    }

    pub fn delta(&self) -> Option<u32> {
        self.field.as_ref().and_then(|f| f.delta)
    }

    pub fn prop_name(&self) -> Option<&str> {
        self.field.as_ref().and_then(|f| f.prop_name.as_deref())
    }
}

/// A prop of an already instantiated component, e.g. `⿲<uuid>␟heading`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentProp {
    component_instance_uuid: String,
    prop_name: String,
}

impl ComponentProp {
    pub fn new(
        component_instance_uuid: impl Into<String>,
        prop_name: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let e = ComponentProp {
            component_instance_uuid: component_instance_uuid.into(),
            prop_name: prop_name.into(),
        };
        check_name("component instance uuid", &e.component_instance_uuid)?;
        check_name("prop name", &e.prop_name)?;
        Ok(e)
    }

    pub fn component_instance_uuid(&self) -> &str {
        &self.component_instance_uuid
    }

    pub fn prop_name(&self) -> &str {
        &self.prop_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    FieldTypeProp(FieldTypeProp),
    ReferenceFieldTypeProp(ReferenceFieldTypeProp),
    FieldTypeObjectProps(FieldTypeObjectProps),
    StructuredDataProp(StructuredDataProp),
    ComponentProp(ComponentProp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    FieldTypeProp,
    ReferenceFieldTypeProp,
    FieldTypeObjectProps,
    StructuredDataProp,
    ComponentProp,
}

impl ExpressionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpressionKind::FieldTypeProp => "field_type_prop",
            ExpressionKind::ReferenceFieldTypeProp => "reference_field_type_prop",
            ExpressionKind::FieldTypeObjectProps => "field_type_object_props",
            ExpressionKind::StructuredDataProp => "structured_data_prop",
            ExpressionKind::ComponentProp => "component_prop",
        }
    }
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::FieldTypeProp(_) => ExpressionKind::FieldTypeProp,
            Expression::ReferenceFieldTypeProp(_) => ExpressionKind::ReferenceFieldTypeProp,
            Expression::FieldTypeObjectProps(_) => ExpressionKind::FieldTypeObjectProps,
            Expression::StructuredDataProp(_) => ExpressionKind::StructuredDataProp,
            Expression::ComponentProp(_) => ExpressionKind::ComponentProp,
        }
    }

    /// Whether this expression can back a storable prop shape, i.e. it
    /// addresses a field type rather than concrete data.
    pub fn is_field_type_expression(&self) -> bool {
        self.field_type().is_some()
    }

    pub fn field_type(&self) -> Option<&str> {
        match self {
            Expression::FieldTypeProp(e) => Some(&e.field_type),
            Expression::ReferenceFieldTypeProp(e) => Some(&e.base.field_type),
            Expression::FieldTypeObjectProps(e) => Some(&e.field_type),
            Expression::StructuredDataProp(_) | Expression::ComponentProp(_) => None,
        }
    }

    /// Structured JSON description, for tooling output.
    pub fn describe(&self) -> Value {
        let mut out = match self {
            Expression::FieldTypeProp(e) => json!({
                "field_type": e.field_type,
                "prop_name": e.prop_name,
            }),
            Expression::ReferenceFieldTypeProp(e) => json!({
                "field_type": e.base.field_type,
                "prop_name": e.base.prop_name,
                "referenced_prop_path": e.referenced_prop_path(),
                "referenced_prop_name": e.referenced_prop_name,
            }),
            Expression::FieldTypeObjectProps(e) => {
                let mut map = serde_json::Map::new();
                for (source, target) in &e.prop_map {
                    let target = match target {
                        ObjectPropTarget::Prop(p) => json!({ "prop_name": p }),
                        ObjectPropTarget::FollowReference {
                            prop_name,
                            referenced,
                            referenced_prop_name,
                        } => {
                            let mut path = String::new();
                            serialize::write_referenced_field(&mut path, referenced);
                            json!({
                                "prop_name": prop_name,
                                "referenced_prop_path": path,
                                "referenced_prop_name": referenced_prop_name,
                            })
                        }
                    };
                    map.insert(source.clone(), target);
                }
                json!({ "field_type": e.field_type, "prop_map": map })
            }
            Expression::StructuredDataProp(e) => json!({
                "entity_type": e.entity_type,
                "bundle": e.bundle,
                "field_name": e.field_name(),
                "delta": e.delta(),
                "prop_name": e.prop_name(),
            }),
            Expression::ComponentProp(e) => json!({
                "component_instance_uuid": e.component_instance_uuid,
                "prop_name": e.prop_name,
            }),
        };
        if let Value::Object(map) = &mut out {
            map.insert("kind".to_owned(), json!(self.kind().as_str()));
        }
        out
    }
}

impl From<FieldTypeProp> for Expression {
    fn from(e: FieldTypeProp) -> Self {
        Expression::FieldTypeProp(e)
    }
}

impl From<ReferenceFieldTypeProp> for Expression {
    fn from(e: ReferenceFieldTypeProp) -> Self {
        Expression::ReferenceFieldTypeProp(e)
    }
}

impl From<FieldTypeObjectProps> for Expression {
    fn from(e: FieldTypeObjectProps) -> Self {
        Expression::FieldTypeObjectProps(e)
    }
}

impl From<StructuredDataProp> for Expression {
    fn from(e: StructuredDataProp) -> Self {
        Expression::StructuredDataProp(e)
    }
}

impl From<ComponentProp> for Expression {
    fn from(e: ComponentProp) -> Self {
        Expression::ComponentProp(e)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}

impl FromStr for Expression {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

// Expressions are persisted as their canonical string.
impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&serialize(self))
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }
}
