//! End-to-end resolution: raw shape → normalized shape → storable shape.

use propshape_core::resolver::{Cardinality, CandidateStorableShape};
use propshape_core::{
    dedup_key, normalize, serialize, AlterChain, AlterRegistry, DeclarativeOverride,
    DefinitionRegistry, Expression, FieldTypeProp, InvariantError, Resolver, SchemaType,
};
use proptest::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

fn link_override() -> AlterChain {
    let mut registry = AlterRegistry::new();
    registry.register("link_for_uri", |c: &mut CandidateStorableShape| {
        if c.shape().format() == Some("uri") {
            c.field_type_prop = Some(FieldTypeProp::new("link", "url").unwrap().into());
            c.field_widget = Some("link_default".into());
            c.field_instance_settings = Some([("title".to_owned(), json!("disabled"))].into());
        }
    });
    registry.freeze()
}

#[test]
fn uri_string_becomes_a_link() {
    let shape = normalize(&json!({ "type": "string", "format": "uri", "title": "Link" })).unwrap();
    let storable = propshape_core::resolve(&shape, &link_override())
        .unwrap()
        .unwrap();

    assert_eq!(
        storable.field_type_prop(),
        &Expression::from(FieldTypeProp::new("link", "url").unwrap())
    );
    assert_eq!(serialize(storable.field_type_prop()), "\u{2139}\u{FE0E}link\u{241F}url");
    assert_eq!(storable.field_widget(), "link_default");
    assert_eq!(storable.cardinality(), None);
    assert_eq!(
        storable.field_instance_settings().unwrap().get("title"),
        Some(&json!("disabled"))
    );
}

#[test]
fn string_list_is_unlimited() {
    let shape = normalize(&json!({ "type": "array", "items": { "type": "string" } })).unwrap();
    let storable = Resolver::default().resolve(&shape).unwrap().unwrap();
    assert_eq!(storable.cardinality(), Some(Cardinality::Unlimited));
    assert_eq!(
        serde_json::to_value(storable.cardinality()).unwrap(),
        json!("unlimited")
    );
}

#[test]
fn string_list_with_a_single_slot_is_rejected() {
    let mut registry = AlterRegistry::new();
    registry.register("one_slot", |c: &mut CandidateStorableShape| {
        c.cardinality = Some(Cardinality::Limited(1))
    });
    let shape = normalize(&json!({ "type": "array", "items": { "type": "string" } })).unwrap();
    assert_eq!(
        propshape_core::resolve(&shape, &registry.freeze()),
        Err(InvariantError::InvalidArrayCardinality { cardinality: 1 })
    );
}

#[test]
fn callback_widget_wins_over_the_builtin() {
    let shape = normalize(&json!({ "type": "string" })).unwrap();
    assert_eq!(
        Resolver::default()
            .resolve(&shape)
            .unwrap()
            .unwrap()
            .field_widget(),
        "string_textfield"
    );

    let mut registry = AlterRegistry::new();
    registry.register("rich", |c: &mut CandidateStorableShape| {
        c.field_widget = Some("string_textarea".into())
    });
    let storable = propshape_core::resolve(&shape, &registry.freeze())
        .unwrap()
        .unwrap();
    assert_eq!(storable.field_widget(), "string_textarea");
    assert_eq!(storable.field_type_prop().to_string(), "ℹ︎string␟value");
}

#[test]
fn informational_differences_share_a_dedup_key() {
    let a = normalize(&json!({
        "title": "Hero",
        "type": "object",
        "properties": {
            "heading": { "type": "string", "description": "Main heading" },
        },
    }))
    .unwrap();
    let b = normalize(&json!({
        "properties": {
            "heading": { "examples": ["Hello"], "type": "string" },
        },
        "type": "object",
        "description": "A hero banner",
    }))
    .unwrap();
    assert_eq!(dedup_key(&a), dedup_key(&b));
}

#[test]
fn image_gallery_resolves_through_nested_ref() {
    let shape = normalize(&json!({
        "type": "array",
        "maxItems": 6,
        "items": { "$ref": "json-schema-definitions://propshape/image" },
    }))
    .unwrap();
    // The array rule finds no item default until the ref is inlined.
    let storable = Resolver::default().resolve(&shape).unwrap().unwrap();
    assert_eq!(storable.field_widget(), "image_image");
    assert_eq!(storable.cardinality(), Some(Cardinality::Limited(6)));
}

#[test]
fn registered_definitions_take_part_in_resolution() {
    let mut definitions = DefinitionRegistry::with_builtins();
    definitions
        .register(
            "json-schema-definitions://acme/rating",
            json!({ "type": "integer", "minimum": 1, "maximum": 5 }),
        )
        .unwrap();
    let resolver = Resolver::new(definitions, AlterChain::empty());
    let shape = normalize(&json!({ "$ref": "json-schema-definitions://acme/rating" })).unwrap();
    let storable = resolver.resolve(&shape).unwrap().unwrap();
    assert_eq!(storable.field_type_prop().to_string(), "ℹ︎integer␟value");
    assert_eq!(
        storable.field_instance_settings().unwrap().get("max"),
        Some(&json!(5))
    );
}

#[derive(Deserialize)]
struct OverrideFile {
    alter: Vec<DeclarativeOverride>,
}

#[test]
fn toml_overrides_drive_the_alteration_chain() {
    let file: OverrideFile = toml::from_str(
        r#"
        [[alter]]
        name = "links"
        when = { type = "string", format = "uri" }
        set = { field_type_prop = "ℹ︎link␟url", field_widget = "link_default", field_instance_settings = { title = "disabled" } }

        [[alter]]
        name = "tag_limit"
        when = { type = "array" }
        set = { cardinality = 10 }
        "#,
    )
    .unwrap();
    assert_eq!(file.alter[0].when.schema_type, Some(SchemaType::String));

    let mut registry = AlterRegistry::new();
    registry.extend_overrides(file.alter);
    let resolver = Resolver::new(DefinitionRegistry::with_builtins(), registry.freeze());

    let link = resolver
        .resolve(&normalize(&json!({ "type": "string", "format": "uri" })).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(link.field_type_prop().to_string(), "ℹ︎link␟url");

    let tags = resolver
        .resolve(&normalize(&json!({ "type": "array", "items": { "type": "string" } })).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(tags.cardinality(), Some(Cardinality::Limited(10)));
}

// ── Cardinality invariant over generated shapes ───────────────────────

fn item_shape() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({ "type": "string" })),
        Just(json!({ "type": "string", "format": "date" })),
        Just(json!({ "type": "integer", "enum": [1, 2] })),
        Just(json!({ "type": "boolean" })),
        Just(json!({ "$ref": "json-schema-definitions://propshape/image" })),
        Just(json!({ "type": "object", "properties": { "a": { "type": "string" } } })),
    ]
}

fn any_shape() -> impl Strategy<Value = Value> {
    prop_oneof![
        item_shape(),
        (item_shape(), proptest::option::of(0u64..5)).prop_map(|(items, max)| match max {
            Some(max) => json!({ "type": "array", "items": items, "maxItems": max }),
            None => json!({ "type": "array", "items": items }),
        }),
    ]
}

proptest! {
    #[test]
    fn cardinality_follows_the_shape(raw in any_shape()) {
        let shape = normalize(&raw).unwrap();
        if let Some(storable) = Resolver::default().resolve(&shape).unwrap() {
            match storable.cardinality() {
                None => prop_assert!(!shape.is_array()),
                Some(Cardinality::Unlimited) => prop_assert!(shape.is_array()),
                Some(Cardinality::Limited(n)) => prop_assert!(shape.is_array() && n >= 2),
            }
        }
    }
}
