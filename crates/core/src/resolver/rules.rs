//! Builtin storage defaults, one pure function per schema type.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::debug;

use super::{Cardinality, FieldSettings};
use crate::expression::{
    Expression, FieldTypeObjectProps, FieldTypeProp, ObjectPropTarget, ReferencedField,
};
use crate::shape::{PropShape, SchemaType, DATE_RANGE_DEFINITION, IMAGE_DEFINITION};

/// What a builtin rule proposes for a shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StorageDefault {
    pub field_type_prop: Expression,
    pub field_widget: String,
    pub cardinality: Option<Cardinality>,
    pub field_storage_settings: Option<FieldSettings>,
    pub field_instance_settings: Option<FieldSettings>,
}

impl StorageDefault {
    fn new(field_type_prop: impl Into<Expression>, field_widget: &str) -> Self {
        StorageDefault {
            field_type_prop: field_type_prop.into(),
            field_widget: field_widget.to_owned(),
            cardinality: None,
            field_storage_settings: None,
            field_instance_settings: None,
        }
    }

    fn value_of(field_type: &'static str, field_widget: &str) -> Self {
        Self::new(FieldTypeProp::builtin(field_type, "value"), field_widget)
    }

    fn storage_setting(mut self, name: &str, value: Value) -> Self {
        self.field_storage_settings
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_owned(), value);
        self
    }

    fn instance_setting(mut self, name: &str, value: Value) -> Self {
        self.field_instance_settings
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_owned(), value);
        self
    }
}

/// Step 1 of resolution: the builtin default for `shape`, if any.
///
/// A shape without a `type` (a bare `$ref`) has no default.
pub(crate) fn storage_default(shape: &PropShape) -> Option<StorageDefault> {
    let schema_type = shape.schema_type()?;
    let outcome = match schema_type {
        SchemaType::String => string_default(shape),
        SchemaType::Integer => integer_default(shape),
        SchemaType::Number => number_default(shape),
        SchemaType::Boolean => boolean_default(shape),
        SchemaType::Object => object_default(shape),
        SchemaType::Array => array_default(shape),
    };
    debug!(
        schema_type = %schema_type,
        field_type_prop = ?outcome.as_ref().map(|d| d.field_type_prop.to_string()),
        "builtin storage default"
    );
    outcome
}

fn allowed_values(values: &[Value]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| json!({ "value": v, "label": label_for(v) }))
            .collect(),
    )
}

fn label_for(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_default(shape: &PropShape) -> Option<StorageDefault> {
    if let Some(values) = shape.enum_values() {
        return Some(
            StorageDefault::value_of("list_string", "options_select")
                .storage_setting("allowed_values", allowed_values(values)),
        );
    }
    match shape.format() {
        Some("date-time") => {
            return Some(
                StorageDefault::value_of("datetime", "datetime_default")
                    .storage_setting("datetime_type", json!("datetime")),
            )
        }
        Some("date") => {
            return Some(
                StorageDefault::value_of("datetime", "datetime_default")
                    .storage_setting("datetime_type", json!("date")),
            )
        }
        Some("uri") | Some("iri") => return Some(StorageDefault::value_of("uri", "uri")),
        Some("uri-reference") | Some("iri-reference") => {
            // Image sources only make sense as part of the image object.
            if shape
                .content_media_type()
                .is_some_and(|m| m.starts_with("image/"))
            {
                return None;
            }
            return Some(
                StorageDefault::new(FieldTypeProp::builtin("link", "uri"), "link_default")
                    .instance_setting("title", json!("disabled")),
            );
        }
        Some("email") | Some("idn-email") => {
            return Some(StorageDefault::value_of("email", "email_default"))
        }
        _ => {}
    }
    if shape.content_media_type() == Some("text/html") {
        return Some(StorageDefault::value_of("text_long", "text_textarea"));
    }
    let mut default = StorageDefault::value_of("string", "string_textfield");
    if let Some(max) = shape.keyword("maxLength").and_then(Value::as_u64) {
        default = default.storage_setting("max_length", json!(max));
    }
    Some(default)
}

fn with_range(mut default: StorageDefault, shape: &PropShape) -> StorageDefault {
    if let Some(min) = shape.keyword("minimum") {
        default = default.instance_setting("min", min.clone());
    }
    if let Some(max) = shape.keyword("maximum") {
        default = default.instance_setting("max", max.clone());
    }
    default
}

fn integer_default(shape: &PropShape) -> Option<StorageDefault> {
    if let Some(values) = shape.enum_values() {
        return Some(
            StorageDefault::value_of("list_integer", "options_select")
                .storage_setting("allowed_values", allowed_values(values)),
        );
    }
    Some(with_range(StorageDefault::value_of("integer", "number"), shape))
}

fn number_default(shape: &PropShape) -> Option<StorageDefault> {
    if let Some(values) = shape.enum_values() {
        return Some(
            StorageDefault::value_of("list_float", "options_select")
                .storage_setting("allowed_values", allowed_values(values)),
        );
    }
    Some(with_range(StorageDefault::value_of("float", "number"), shape))
}

fn boolean_default(_shape: &PropShape) -> Option<StorageDefault> {
    Some(StorageDefault::value_of("boolean", "boolean_checkbox"))
}

/// Objects have no structural default; only named shapes map to storage.
fn object_default(shape: &PropShape) -> Option<StorageDefault> {
    match shape.reference()? {
        IMAGE_DEFINITION => Some(StorageDefault::new(
            FieldTypeObjectProps::builtin(
                "image",
                vec![
                    (
                        "src",
                        ObjectPropTarget::FollowReference {
                            prop_name: "entity".to_owned(),
                            referenced: ReferencedField::builtin("file", "uri"),
                            referenced_prop_name: "url".to_owned(),
                        },
                    ),
                    ("alt", ObjectPropTarget::Prop("alt".to_owned())),
                    ("width", ObjectPropTarget::Prop("width".to_owned())),
                    ("height", ObjectPropTarget::Prop("height".to_owned())),
                ],
            ),
            "image_image",
        )),
        DATE_RANGE_DEFINITION => Some(
            StorageDefault::new(
                FieldTypeObjectProps::builtin(
                    "daterange",
                    vec![
                        ("from", ObjectPropTarget::Prop("value".to_owned())),
                        ("to", ObjectPropTarget::Prop("end_value".to_owned())),
                    ],
                ),
                "daterange_default",
            )
            .storage_setting("datetime_type", json!("date")),
        ),
        _ => None,
    }
}

/// Lists reuse their item's mapping as a multi-value field.
fn array_default(shape: &PropShape) -> Option<StorageDefault> {
    let items = shape.items()?;
    let cardinality = match shape.keyword("maxItems") {
        None => Cardinality::Unlimited,
        Some(max) => match max.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n >= 2 => Cardinality::Limited(n),
            _ => return None,
        },
    };
    let mut default = storage_default(items)?;
    if default.cardinality.is_some() {
        // Lists of lists cannot be stored in a single field.
        return None;
    }
    default.cardinality = Some(cardinality);
    Some(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::normalize;

    fn default_for(raw: Value) -> Option<StorageDefault> {
        storage_default(&normalize(&raw).unwrap())
    }

    fn field_type_prop(raw: Value) -> Option<String> {
        default_for(raw).map(|d| d.field_type_prop.to_string())
    }

    #[test]
    fn plain_string() {
        let d = default_for(json!({ "type": "string", "maxLength": 255 })).unwrap();
        assert_eq!(d.field_type_prop.to_string(), "ℹ︎string␟value");
        assert_eq!(d.field_widget, "string_textfield");
        assert_eq!(
            d.field_storage_settings.unwrap().get("max_length"),
            Some(&json!(255))
        );
    }

    #[test]
    fn string_formats() {
        assert_eq!(
            field_type_prop(json!({ "type": "string", "format": "uri" })).as_deref(),
            Some("ℹ︎uri␟value")
        );
        assert_eq!(
            field_type_prop(json!({ "type": "string", "format": "uri-reference" })).as_deref(),
            Some("ℹ︎link␟uri")
        );
        assert_eq!(
            field_type_prop(json!({ "type": "string", "format": "email" })).as_deref(),
            Some("ℹ︎email␟value")
        );
        assert_eq!(
            field_type_prop(json!({ "type": "string", "contentMediaType": "text/html" }))
                .as_deref(),
            Some("ℹ︎text_long␟value")
        );
        assert_eq!(
            field_type_prop(json!({
                "type": "string",
                "format": "uri-reference",
                "contentMediaType": "image/*",
            })),
            None
        );
    }

    #[test]
    fn dates_record_their_precision() {
        let d = default_for(json!({ "type": "string", "format": "date" })).unwrap();
        assert_eq!(d.field_widget, "datetime_default");
        assert_eq!(
            d.field_storage_settings.unwrap().get("datetime_type"),
            Some(&json!("date"))
        );
    }

    #[test]
    fn enums_become_option_lists() {
        let d = default_for(json!({ "type": "integer", "enum": [1, 2, 3] })).unwrap();
        assert_eq!(d.field_type_prop.to_string(), "ℹ︎list_integer␟value");
        assert_eq!(d.field_widget, "options_select");
        let allowed = d.field_storage_settings.unwrap()["allowed_values"].clone();
        assert_eq!(allowed[2], json!({ "value": 3, "label": "3" }));
    }

    #[test]
    fn numeric_ranges_become_instance_settings() {
        let d = default_for(json!({ "type": "number", "minimum": 0, "maximum": 1.5 })).unwrap();
        let settings = d.field_instance_settings.unwrap();
        assert_eq!(settings["min"], json!(0));
        assert_eq!(settings["max"], json!(1.5));
    }

    #[test]
    fn objects_need_a_known_name() {
        assert!(default_for(json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
        }))
        .is_none());
        let d = default_for(json!({ "type": "object", "$ref": IMAGE_DEFINITION })).unwrap();
        assert_eq!(
            d.field_type_prop.to_string(),
            "ℹ︎image␟{src↝entity␜␜file␝uri␞␟url,alt↠alt,width↠width,height↠height}"
        );
    }

    #[test]
    fn arrays_take_their_cardinality_from_max_items() {
        let unlimited =
            default_for(json!({ "type": "array", "items": { "type": "string" } })).unwrap();
        assert_eq!(unlimited.cardinality, Some(Cardinality::Unlimited));

        let limited = default_for(json!({
            "type": "array",
            "items": { "type": "integer" },
            "maxItems": 4,
        }))
        .unwrap();
        assert_eq!(limited.cardinality, Some(Cardinality::Limited(4)));

        assert!(default_for(json!({
            "type": "array",
            "items": { "type": "integer" },
            "maxItems": 1,
        }))
        .is_none());
    }

    #[test]
    fn nested_arrays_have_no_default() {
        assert!(default_for(json!({
            "type": "array",
            "items": { "type": "array", "items": { "type": "string" } },
        }))
        .is_none());
    }

    #[test]
    fn bare_refs_have_no_default() {
        assert!(default_for(json!({ "$ref": IMAGE_DEFINITION })).is_none());
    }
}
