use crate::expression::Expression;

/// An expression string that does not match any expression variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// The input was rejected as a whole; no partial parse is ever returned.
    #[error("malformed expression {input:?} at character {offset}: {reason}")]
    Malformed {
        input: String,
        /// Character (not byte) offset of the offending token.
        offset: usize,
        reason: String,
    },

    /// A name handed to an expression constructor that the canonical string
    /// form could not carry.
    #[error("invalid {part} {value:?}: {reason}")]
    InvalidName {
        part: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl GrammarError {
    pub fn malformed(input: &str, offset: usize, reason: impl Into<String>) -> Self {
        GrammarError::Malformed {
            input: input.to_owned(),
            offset,
            reason: reason.into(),
        }
    }
}

/// Errors raised while normalizing a raw shape or resolving its references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("prop shape at '{path}' must be a JSON object")]
    NotAnObject { path: String },

    #[error("prop shape at '{path}' has neither 'type' nor '$ref'")]
    MissingType { path: String },

    #[error("prop shape at '{path}' has unknown type '{name}'")]
    UnknownType { path: String, name: String },

    #[error("prop shape at '{path}' has an unsupported type declaration: {detail}")]
    InvalidType { path: String, detail: String },

    #[error("prop shape at '{path}' has an invalid '{keyword}' keyword: {detail}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        detail: String,
    },

    /// Not fatal for resolution: the resolver treats this as "no mapping".
    #[error("$ref '{uri}' does not point at a known definition")]
    UnknownReferenceTarget { uri: String },
}

/// A finalized candidate that breaks the storable shape invariants.
///
/// Always the result of a defective rule or alteration callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("field widget '{widget}' is set but no field type prop is")]
    WidgetWithoutFieldTypeProp { widget: String },

    #[error("field type prop '{expression}' is set but no field widget is")]
    FieldTypePropWithoutWidget { expression: Expression },

    #[error("'{expression}' does not reference a field type property")]
    NotAFieldTypeExpression { expression: Expression },

    #[error("array shapes require a cardinality")]
    MissingCardinality,

    #[error("array shapes require a cardinality of at least 2, got {cardinality}")]
    InvalidArrayCardinality { cardinality: u32 },

    #[error("cardinality is only allowed on array shapes, got '{cardinality}' on a {schema_type} shape")]
    CardinalityOnNonArray {
        cardinality: String,
        schema_type: String,
    },

    #[error("object prop '{prop}' mapped by '{expression}' is not declared by the shape")]
    UnknownObjectProp { prop: String, expression: Expression },
}

/// A resolved field widget with no client-side transforms registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field widget '{widget}' has no registered client-side transforms")]
pub struct MissingWidgetTransform {
    pub widget: String,
}

/// A persisted settings blob that cannot be turned back into storable shapes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("prop '{prop}': {source}")]
    Expression {
        prop: String,
        #[source]
        source: GrammarError,
    },

    #[error("prop '{prop}': {source}")]
    Invariant {
        prop: String,
        #[source]
        source: InvariantError,
    },

    #[error("prop '{prop}' has no shape in the component source")]
    UnknownProp { prop: String },
}
