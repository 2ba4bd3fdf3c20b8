//! Storable-shape resolution: from a normalized prop shape to a concrete
//! field type, widget, cardinality and settings.
//!
//! Resolution runs in five steps:
//!
//! 1. the builtin rule for the shape's type proposes a default;
//! 2. if it proposes nothing and the shape still has an unresolved `$ref`,
//!    the reference is inlined and step 1 is retried once;
//! 3. the outcome (possibly nothing) becomes a [`CandidateStorableShape`];
//! 4. every registered alteration callback mutates that candidate, in order;
//! 5. the candidate is finalized into a [`StorableShape`], or `None` when no
//!    field type prop was chosen.

pub mod alter;
mod rules;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::InvariantError;
use crate::expression::Expression;
use crate::shape::{resolve_refs, DefinitionRegistry, PropShape, SchemaType};

pub use alter::{
    AlterCallback, AlterChain, AlterRegistry, DeclarativeOverride, OverrideValues, ShapeMatcher,
};

/// Field storage or field instance settings.
pub type FieldSettings = BTreeMap<String, Value>;

/// How many values a list-valued prop may store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CardinalityRepr", into = "CardinalityRepr")]
pub enum Cardinality {
    Unlimited,
    Limited(u32),
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Unlimited => f.write_str("unlimited"),
            Cardinality::Limited(n) => write!(f, "{}", n),
        }
    }
}

impl Cardinality {
    /// The persisted JSON form.
    pub fn to_value(self) -> Value {
        match self {
            Cardinality::Unlimited => Value::from("unlimited"),
            Cardinality::Limited(n) => Value::from(n),
        }
    }
}

/// Persisted as the string `"unlimited"` or an integer. `-1` is read as
/// unlimited too, since that is how field storage encodes it.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CardinalityRepr {
    Keyword(String),
    Count(i64),
}

impl From<Cardinality> for CardinalityRepr {
    fn from(c: Cardinality) -> Self {
        match c {
            Cardinality::Unlimited => CardinalityRepr::Keyword("unlimited".to_owned()),
            Cardinality::Limited(n) => CardinalityRepr::Count(i64::from(n)),
        }
    }
}

impl TryFrom<CardinalityRepr> for Cardinality {
    type Error = String;

    fn try_from(repr: CardinalityRepr) -> Result<Self, Self::Error> {
        match repr {
            CardinalityRepr::Keyword(k) if k == "unlimited" => Ok(Cardinality::Unlimited),
            CardinalityRepr::Keyword(k) => Err(format!("unknown cardinality '{}'", k)),
            CardinalityRepr::Count(-1) => Ok(Cardinality::Unlimited),
            CardinalityRepr::Count(n) => u32::try_from(n)
                .map(Cardinality::Limited)
                .map_err(|_| format!("cardinality {} is out of range", n)),
        }
    }
}

/// The mutable draft that alteration callbacks work on.
///
/// The shape and its structure are read-only; every other field may be
/// overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStorableShape {
    shape: PropShape,
    structure: PropShape,
    pub field_type_prop: Option<Expression>,
    pub field_widget: Option<String>,
    pub cardinality: Option<Cardinality>,
    pub field_storage_settings: Option<FieldSettings>,
    pub field_instance_settings: Option<FieldSettings>,
}

impl CandidateStorableShape {
    pub fn new(shape: PropShape) -> Self {
        CandidateStorableShape {
            structure: shape.clone(),
            shape,
            field_type_prop: None,
            field_widget: None,
            cardinality: None,
            field_storage_settings: None,
            field_instance_settings: None,
        }
    }

    /// The prop shape as authored.
    pub fn shape(&self) -> &PropShape {
        &self.shape
    }

    /// The shape the invariants are checked against: the inlined shape when
    /// a bare `$ref` had to be resolved, else the shape itself.
    pub fn structure(&self) -> &PropShape {
        &self.structure
    }

    fn with_default(
        shape: PropShape,
        structure: PropShape,
        default: Option<rules::StorageDefault>,
    ) -> Self {
        let mut candidate = CandidateStorableShape::new(shape);
        candidate.structure = structure;
        if let Some(d) = default {
            candidate.field_type_prop = Some(d.field_type_prop);
            candidate.field_widget = Some(d.field_widget);
            candidate.cardinality = d.cardinality;
            candidate.field_storage_settings = d.field_storage_settings;
            candidate.field_instance_settings = d.field_instance_settings;
        }
        candidate
    }

    /// Step 5.
    fn finalize(self) -> Result<Option<StorableShape>, InvariantError> {
        let (field_type_prop, field_widget) = match (self.field_type_prop, self.field_widget) {
            (None, None) => return Ok(None),
            (None, Some(widget)) => {
                return Err(InvariantError::WidgetWithoutFieldTypeProp { widget })
            }
            (Some(expression), None) => {
                return Err(InvariantError::FieldTypePropWithoutWidget { expression })
            }
            (Some(e), Some(w)) => (e, w),
        };
        StorableShape::checked(
            self.shape,
            self.structure,
            field_type_prop,
            field_widget,
            self.cardinality,
            self.field_storage_settings,
            self.field_instance_settings,
        )
        .map(Some)
    }
}

fn check_cardinality(
    structure: &PropShape,
    cardinality: Option<Cardinality>,
) -> Result<(), InvariantError> {
    match (structure.is_array(), cardinality) {
        (true, None) => Err(InvariantError::MissingCardinality),
        (true, Some(Cardinality::Limited(n))) if n < 2 => {
            Err(InvariantError::InvalidArrayCardinality { cardinality: n })
        }
        (true, Some(_)) | (false, None) => Ok(()),
        (false, Some(c)) => Err(InvariantError::CardinalityOnNonArray {
            cardinality: c.to_string(),
            schema_type: structure
                .schema_type()
                .map_or("untyped", SchemaType::as_str)
                .to_owned(),
        }),
    }
}

/// Every object prop an object-props expression maps must be declared by the
/// (item) shape, when the shape declares its properties at all.
fn check_object_props(structure: &PropShape, expr: &Expression) -> Result<(), InvariantError> {
    let Expression::FieldTypeObjectProps(object_props) = expr else {
        return Ok(());
    };
    let object_shape = if structure.is_array() {
        structure.items()
    } else {
        Some(structure)
    };
    let Some(declared) = object_shape.and_then(PropShape::properties) else {
        return Ok(());
    };
    for (source, _) in object_props.prop_map() {
        if !declared.iter().any(|(name, _)| name == source) {
            return Err(InvariantError::UnknownObjectProp {
                prop: source.clone(),
                expression: expr.clone(),
            });
        }
    }
    Ok(())
}

/// A fully resolved, immutable prop-to-storage mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StorableShapeRepr", into = "StorableShapeRepr")]
pub struct StorableShape {
    shape: PropShape,
    structure: PropShape,
    field_type_prop: Expression,
    field_widget: String,
    cardinality: Option<Cardinality>,
    field_storage_settings: Option<FieldSettings>,
    field_instance_settings: Option<FieldSettings>,
}

impl StorableShape {
    pub fn shape(&self) -> &PropShape {
        &self.shape
    }

    /// The inlined shape the mapping was validated against; equal to
    /// [`shape`](Self::shape) unless a bare `$ref` was resolved.
    pub fn structure(&self) -> &PropShape {
        &self.structure
    }

    pub fn field_type_prop(&self) -> &Expression {
        &self.field_type_prop
    }

    pub fn field_widget(&self) -> &str {
        &self.field_widget
    }

    pub fn cardinality(&self) -> Option<Cardinality> {
        self.cardinality
    }

    pub fn field_storage_settings(&self) -> Option<&FieldSettings> {
        self.field_storage_settings.as_ref()
    }

    pub fn field_instance_settings(&self) -> Option<&FieldSettings> {
        self.field_instance_settings.as_ref()
    }

    /// Rebuild a storable shape from its parts, enforcing the same invariants
    /// as resolution does. `structure` defaults to `shape`.
    pub fn from_parts(
        shape: PropShape,
        structure: Option<PropShape>,
        field_type_prop: Expression,
        field_widget: String,
        cardinality: Option<Cardinality>,
        field_storage_settings: Option<FieldSettings>,
        field_instance_settings: Option<FieldSettings>,
    ) -> Result<Self, InvariantError> {
        let structure = structure.unwrap_or_else(|| shape.clone());
        StorableShape::checked(
            shape,
            structure,
            field_type_prop,
            field_widget,
            cardinality,
            field_storage_settings,
            field_instance_settings,
        )
    }

    fn checked(
        shape: PropShape,
        structure: PropShape,
        field_type_prop: Expression,
        field_widget: String,
        cardinality: Option<Cardinality>,
        field_storage_settings: Option<FieldSettings>,
        field_instance_settings: Option<FieldSettings>,
    ) -> Result<Self, InvariantError> {
        if !field_type_prop.is_field_type_expression() {
            return Err(InvariantError::NotAFieldTypeExpression {
                expression: field_type_prop,
            });
        }
        check_cardinality(&structure, cardinality)?;
        check_object_props(&structure, &field_type_prop)?;

        Ok(StorableShape {
            shape,
            structure,
            field_type_prop,
            field_widget,
            cardinality,
            field_storage_settings,
            field_instance_settings,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct StorableShapeRepr {
    shape: PropShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    structure: Option<PropShape>,
    field_type_prop: Expression,
    field_widget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cardinality: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_storage_settings: Option<FieldSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_instance_settings: Option<FieldSettings>,
}

impl From<StorableShape> for StorableShapeRepr {
    fn from(s: StorableShape) -> Self {
        let structure = (s.structure != s.shape).then_some(s.structure);
        StorableShapeRepr {
            shape: s.shape,
            structure,
            field_type_prop: s.field_type_prop,
            field_widget: s.field_widget,
            cardinality: s.cardinality,
            field_storage_settings: s.field_storage_settings,
            field_instance_settings: s.field_instance_settings,
        }
    }
}

impl TryFrom<StorableShapeRepr> for StorableShape {
    type Error = InvariantError;

    fn try_from(r: StorableShapeRepr) -> Result<Self, Self::Error> {
        StorableShape::from_parts(
            r.shape,
            r.structure,
            r.field_type_prop,
            r.field_widget,
            r.cardinality,
            r.field_storage_settings,
            r.field_instance_settings,
        )
    }
}

/// Resolves prop shapes against a set of definitions and a frozen chain of
/// alteration callbacks.
///
/// A `Resolver` holds no mutable state; share it freely across threads.
#[derive(Debug, Clone)]
pub struct Resolver {
    definitions: DefinitionRegistry,
    alter_chain: AlterChain,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(DefinitionRegistry::with_builtins(), AlterChain::empty())
    }
}

impl Resolver {
    pub fn new(definitions: DefinitionRegistry, alter_chain: AlterChain) -> Self {
        Resolver {
            definitions,
            alter_chain,
        }
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn alter_chain(&self) -> &AlterChain {
        &self.alter_chain
    }

    /// Steps 1-3: the candidate before any alteration.
    pub fn candidate(&self, shape: &PropShape) -> CandidateStorableShape {
        let (default, structure) = self.default_and_structure(shape);
        CandidateStorableShape::with_default(shape.clone(), structure, default)
    }

    /// The shape a mapping of `shape` is validated against. Settings read
    /// back from storage must be rebuilt against this, not the bare shape.
    pub fn structure(&self, shape: &PropShape) -> PropShape {
        self.default_and_structure(shape).1
    }

    fn default_and_structure(
        &self,
        shape: &PropShape,
    ) -> (Option<rules::StorageDefault>, PropShape) {
        let default = rules::storage_default(shape);
        if default.is_some() || !shape.has_unresolved_ref() {
            return (default, shape.clone());
        }
        match resolve_refs(shape, &self.definitions) {
            Ok(resolved) => (rules::storage_default(&resolved), resolved),
            Err(err) => {
                debug!(error = %err, "reference not resolvable, no storage default");
                (None, shape.clone())
            }
        }
    }

    /// Resolve `shape` to its storable form.
    ///
    /// `Ok(None)` means no mapping exists and the prop stays unbound to
    /// storage. An `Err` means a rule or callback produced an impossible
    /// mapping.
    pub fn resolve(&self, shape: &PropShape) -> Result<Option<StorableShape>, InvariantError> {
        let mut candidate = self.candidate(shape);
        self.alter_chain.apply(&mut candidate);
        let resolved = candidate.finalize()?;
        debug!(
            field_type_prop = ?resolved.as_ref().map(|s| s.field_type_prop().to_string()),
            field_widget = ?resolved.as_ref().map(|s| s.field_widget().to_owned()),
            "resolved storable shape"
        );
        Ok(resolved)
    }
}

/// Resolve `shape` with the builtin definitions and the given callbacks.
pub fn resolve(
    shape: &PropShape,
    alter_chain: &AlterChain,
) -> Result<Option<StorableShape>, InvariantError> {
    Resolver::new(DefinitionRegistry::with_builtins(), alter_chain.clone()).resolve(shape)
}
