//! The alteration hook: named callbacks that may rewrite a candidate before
//! it is finalized.
//!
//! Callbacks are collected in an [`AlterRegistry`] at startup and frozen into
//! an [`AlterChain`]. The chain never changes afterwards, so resolution stays
//! a pure function of the shape and the chain.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{Cardinality, CandidateStorableShape, FieldSettings};
use crate::expression::Expression;
use crate::shape::{PropShape, SchemaType};

/// A callback allowed to mutate every non-shape field of a candidate.
pub trait AlterCallback: Send + Sync {
    fn alter(&self, candidate: &mut CandidateStorableShape);
}

impl<F> AlterCallback for F
where
    F: Fn(&mut CandidateStorableShape) + Send + Sync,
{
    fn alter(&self, candidate: &mut CandidateStorableShape) {
        self(candidate)
    }
}

type NamedCallback = (String, Box<dyn AlterCallback>);

/// Append-only collection of callbacks, in registration order.
#[derive(Default)]
pub struct AlterRegistry {
    callbacks: Vec<NamedCallback>,
}

impl AlterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, callback: impl AlterCallback + 'static) {
        self.callbacks.push((name.into(), Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn freeze(self) -> AlterChain {
        AlterChain {
            callbacks: self.callbacks.into(),
        }
    }
}

/// A frozen, shareable chain of callbacks.
#[derive(Clone)]
pub struct AlterChain {
    callbacks: Arc<[NamedCallback]>,
}

impl Default for AlterChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AlterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl AlterChain {
    pub fn empty() -> Self {
        AlterChain {
            callbacks: Arc::new([]),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.iter().map(|(name, _)| name.as_str())
    }

    /// Run every callback in registration order. Later callbacks see the
    /// changes of earlier ones.
    pub fn apply(&self, candidate: &mut CandidateStorableShape) {
        for (name, callback) in self.callbacks.iter() {
            callback.alter(candidate);
            debug!(
                callback = %name,
                field_type_prop = ?candidate.field_type_prop.as_ref().map(Expression::to_string),
                field_widget = ?candidate.field_widget,
                "alteration applied"
            );
        }
    }
}

// ── Declarative overrides ────────────────────────────────────────────────────

/// Which shapes a [`DeclarativeOverride`] applies to. Every condition that is
/// present must hold; an empty matcher matches every shape.
///
/// Overrides match the candidate's structure, so a bare `$ref` is matched by
/// the type and keywords of its definition as well as by its `$ref`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeMatcher {
    #[serde(rename = "type", default)]
    pub schema_type: Option<SchemaType>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(rename = "$ref", alias = "ref", default)]
    pub reference: Option<String>,
    #[serde(rename = "contentMediaType", alias = "content_media_type", default)]
    pub content_media_type: Option<String>,
}

impl ShapeMatcher {
    pub fn matches(&self, shape: &PropShape) -> bool {
        self.schema_type.map_or(true, |t| shape.schema_type() == Some(t))
            && self
                .format
                .as_deref()
                .map_or(true, |f| shape.format() == Some(f))
            && self
                .reference
                .as_deref()
                .map_or(true, |r| shape.reference() == Some(r))
            && self
                .content_media_type
                .as_deref()
                .map_or(true, |m| shape.content_media_type() == Some(m))
    }
}

/// Values written onto a matching candidate. Absent values are left alone;
/// settings replace the candidate's settings wholesale.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideValues {
    #[serde(default)]
    pub field_type_prop: Option<Expression>,
    #[serde(default)]
    pub field_widget: Option<String>,
    #[serde(default)]
    pub cardinality: Option<Cardinality>,
    #[serde(default)]
    pub field_storage_settings: Option<FieldSettings>,
    #[serde(default)]
    pub field_instance_settings: Option<FieldSettings>,
}

/// A config-driven alteration callback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarativeOverride {
    pub name: String,
    #[serde(default)]
    pub when: ShapeMatcher,
    pub set: OverrideValues,
}

impl AlterCallback for DeclarativeOverride {
    fn alter(&self, candidate: &mut CandidateStorableShape) {
        if !self.when.matches(candidate.structure()) {
            return;
        }
        let set = &self.set;
        if let Some(expr) = &set.field_type_prop {
            candidate.field_type_prop = Some(expr.clone());
        }
        if let Some(widget) = &set.field_widget {
            candidate.field_widget = Some(widget.clone());
        }
        if let Some(cardinality) = set.cardinality {
            candidate.cardinality = Some(cardinality);
        }
        if let Some(settings) = &set.field_storage_settings {
            candidate.field_storage_settings = Some(settings.clone());
        }
        if let Some(settings) = &set.field_instance_settings {
            candidate.field_instance_settings = Some(settings.clone());
        }
    }
}

impl AlterRegistry {
    /// Register every override under its own name, in order.
    pub fn extend_overrides(&mut self, overrides: impl IntoIterator<Item = DeclarativeOverride>) {
        for o in overrides {
            let name = o.name.clone();
            self.register(name, o);
        }
    }
}
