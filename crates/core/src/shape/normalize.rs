use std::collections::BTreeMap;

use serde_json::Value;

use super::{PropShape, SchemaType};
use crate::error::ShapeError;

/// Keywords that only inform humans; they never affect storage resolution.
/// `meta:enum` is the per-value label map of an `enum`.
pub const INFORMATIONAL_KEYWORDS: &[&str] =
    &["title", "description", "examples", "meta:enum", "default"];

/// Canonicalize a raw JSON-Schema-like prop description.
///
/// A shape that has a `$ref` but no `type` comes back with only its
/// informational keywords dropped; it is normalized for real once
/// [`resolve_refs`](super::resolve_refs) has inlined the reference.
pub fn normalize(raw: &Value) -> Result<PropShape, ShapeError> {
    normalize_at(raw, "#")
}

fn normalize_at(raw: &Value, path: &str) -> Result<PropShape, ShapeError> {
    let obj = raw.as_object().ok_or_else(|| ShapeError::NotAnObject {
        path: path.to_owned(),
    })?;

    let mut keywords: BTreeMap<String, Value> = obj
        .iter()
        .filter(|(k, _)| !INFORMATIONAL_KEYWORDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let reference = take_string(&mut keywords, "$ref", path)?;

    let Some(type_value) = keywords.remove("type") else {
        return match reference {
            Some(reference) => Ok(PropShape {
                schema_type: None,
                reference: Some(reference),
                format: None,
                properties: None,
                items: None,
                keywords,
            }),
            None => Err(ShapeError::MissingType {
                path: path.to_owned(),
            }),
        };
    };
    let schema_type = coerce_type(&type_value, path)?;
    let format = take_string(&mut keywords, "format", path)?;

    let properties = match keywords.remove("properties") {
        None => None,
        Some(Value::Object(props)) => {
            let mut out = Vec::with_capacity(props.len());
            for (name, sub) in &props {
                let sub_path = format!("{}/properties/{}", path, name);
                out.push((name.clone(), normalize_at(sub, &sub_path)?));
            }
            Some(out)
        }
        Some(_) => {
            return Err(ShapeError::InvalidKeyword {
                path: path.to_owned(),
                keyword: "properties".to_owned(),
                detail: "must be an object of named shapes".to_owned(),
            })
        }
    };

    let items = match keywords.remove("items") {
        None => None,
        Some(items @ Value::Object(_)) => {
            Some(Box::new(normalize_at(&items, &format!("{}/items", path))?))
        }
        Some(_) => {
            return Err(ShapeError::InvalidKeyword {
                path: path.to_owned(),
                keyword: "items".to_owned(),
                detail: "tuple-form items are not supported".to_owned(),
            })
        }
    };

    // `required` is a set.
    if let Some(Value::Array(required)) = keywords.get_mut("required") {
        required.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        required.dedup();
    }
    for value in keywords.values_mut() {
        sort_object_keys(value);
    }

    Ok(PropShape {
        schema_type: Some(schema_type),
        reference,
        format,
        properties,
        items,
        keywords,
    })
}

/// Source shapes may encode `type` as a one-element list.
fn coerce_type(value: &Value, path: &str) -> Result<SchemaType, ShapeError> {
    let name = match value {
        Value::String(s) => s.as_str(),
        Value::Array(list) => match list.as_slice() {
            [Value::String(s)] => s.as_str(),
            _ => {
                return Err(ShapeError::InvalidType {
                    path: path.to_owned(),
                    detail: format!("type lists must hold exactly one type name, got {}", value),
                })
            }
        },
        other => {
            return Err(ShapeError::InvalidType {
                path: path.to_owned(),
                detail: format!("expected a type name, got {}", other),
            })
        }
    };
    SchemaType::from_name(name).ok_or_else(|| ShapeError::UnknownType {
        path: path.to_owned(),
        name: name.to_owned(),
    })
}

/// Constraint keyword values carry no declaration order worth keeping.
fn sort_object_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (k, mut v) in entries {
                sort_object_keys(&mut v);
                map.insert(k, v);
            }
        }
        Value::Array(list) => list.iter_mut().for_each(sort_object_keys),
        _ => {}
    }
}

fn take_string(
    keywords: &mut BTreeMap<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Option<String>, ShapeError> {
    match keywords.remove(keyword) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ShapeError::InvalidKeyword {
            path: path.to_owned(),
            keyword: keyword.to_owned(),
            detail: format!("must be a string, got {}", other),
        }),
    }
}
