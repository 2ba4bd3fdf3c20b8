use serde_json::Value;

use super::PropShape;

/// Identity key of a normalized shape, as a URL-query-like flattening:
/// `type=%22object%22&properties[src][type]=%22string%22&...`.
///
/// The encoding is injective over normalized shapes:
/// - object keys are percent-encoded, so `[`, `]`, `#`, `=` and `&` never
///   appear unescaped inside a path segment;
/// - only top-level keywords are written bare, every nested key is
///   bracketed, so an empty keyword name cannot merge with its children;
/// - array positions are written `[#i]`, which no encoded object key can
///   produce;
/// - leaves are percent-encoded JSON literals, so `"1"` and `1` differ and
///   empty containers (`[]`, `{}`) are leaves of their own.
///
/// Two shapes with the same key are the same shape for storage resolution.
pub fn dedup_key(shape: &PropShape) -> String {
    let mut pairs = Vec::new();
    match shape.to_value() {
        Value::Object(map) => {
            for (keyword, sub) in &map {
                flatten(sub, urlencoding::encode(keyword).into_owned(), &mut pairs);
            }
        }
        other => flatten(&other, String::new(), &mut pairs),
    }
    pairs.join("&")
}

fn flatten(value: &Value, path: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, sub) in map {
                flatten(sub, format!("{}[{}]", path, urlencoding::encode(key)), out);
            }
        }
        Value::Array(list) if !list.is_empty() => {
            for (i, sub) in list.iter().enumerate() {
                flatten(sub, format!("{}[#{}]", path, i), out);
            }
        }
        leaf => out.push(format!(
            "{}={}",
            path,
            urlencoding::encode(&leaf.to_string())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::normalize;
    use serde_json::json;

    fn key(raw: Value) -> String {
        dedup_key(&normalize(&raw).unwrap())
    }

    #[test]
    fn flattens_nested_shapes() {
        assert_eq!(
            key(json!({
                "type": "object",
                "properties": { "alt": { "type": "string", "maxLength": 80 } },
            })),
            "type=%22object%22&properties[alt][type]=%22string%22&properties[alt][maxLength]=80"
        );
    }

    #[test]
    fn ignores_informational_keys_and_keyword_order() {
        let a = key(json!({
            "title": "Link",
            "type": "string",
            "format": "uri",
            "examples": ["https://example.com"],
        }));
        let b = key(json!({ "format": "uri", "description": "Where to go", "type": "string" }));
        assert_eq!(a, b);
    }

    #[test]
    fn declared_property_order_is_significant() {
        let a = key(json!({
            "type": "object",
            "properties": { "a": { "type": "string" }, "b": { "type": "string" } },
        }));
        let b = key(json!({
            "type": "object",
            "properties": { "b": { "type": "string" }, "a": { "type": "string" } },
        }));
        assert_ne!(a, b);
    }

    #[test]
    fn distinguishes_lookalike_values() {
        assert_ne!(
            key(json!({ "type": "string", "enum": ["1"] })),
            key(json!({ "type": "string", "enum": [1] }))
        );
        assert_ne!(
            key(json!({ "type": "object", "x-a": [] })),
            key(json!({ "type": "object", "x-a": {} }))
        );
        assert_ne!(
            key(json!({ "type": "object", "x-a": { "#0": 1 } })),
            key(json!({ "type": "object", "x-a": [1] }))
        );
        assert_ne!(
            key(json!({ "type": "object", "x-a": { "b]=1&c": 1 } })),
            key(json!({ "type": "object", "x-a": { "b": 1, "c": 1 } }))
        );
    }

    #[test]
    fn empty_keyword_names_stay_distinct() {
        let nested = key(json!({ "type": "object", "": { "b": 1 } }));
        let flat = key(json!({ "type": "object", "b": 1 }));
        assert_ne!(nested, flat);
        assert_eq!(nested, "type=%22object%22&[b]=1");
        assert_ne!(
            key(json!({ "type": "object", "": [1] })),
            key(json!({ "type": "object", "[#0]": 1 }))
        );
    }
}
