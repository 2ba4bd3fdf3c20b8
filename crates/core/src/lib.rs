//! propshape-core: structured-data prop expressions and storable prop shape
//! resolution.
//!
//! The crate covers the synchronous, pure half of the engine:
//!
//! - [`expression`] -- the textual grammar for structured-data locations
//!   ([`parse`], [`serialize`])
//! - [`shape`] -- normalization of JSON-Schema-like prop shapes
//!   ([`normalize`], [`resolve_refs`], [`dedup_key`])
//! - [`resolver`] -- resolution of a shape to its storage mapping, with the
//!   alteration hook ([`Resolver`], [`AlterRegistry`])
//! - [`widget`] -- client-side transform validation for resolved widgets
//! - [`settings`] and [`version`] -- the persisted settings blob and the
//!   content hash that identifies a component version

pub mod error;
pub mod expression;
pub mod lexer;
pub mod resolver;
pub mod settings;
pub mod shape;
pub mod version;
pub mod widget;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{GrammarError, InvariantError, MissingWidgetTransform, SettingsError, ShapeError};
pub use expression::{
    ComponentProp, Expression, ExpressionKind, FieldItemPath, FieldTypeObjectProps, FieldTypeProp,
    ObjectPropTarget, ReferenceFieldTypeProp, ReferencedField, StructuredDataProp,
};
pub use resolver::{
    AlterCallback, AlterChain, AlterRegistry, CandidateStorableShape, Cardinality,
    DeclarativeOverride, FieldSettings, Resolver, StorableShape,
};
pub use settings::{ComponentSettingsBlob, PropFieldSettings};
pub use shape::{DefinitionRegistry, PropShape, SchemaType};
pub use widget::{validate_widget_transforms, WidgetTransformRegistry};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use expression::{parse, serialize};
pub use resolver::resolve;
pub use shape::{dedup_key, normalize, resolve_refs};
pub use version::{content_hash, version_id};
