//! Canonical string form of expressions.

use super::{
    ComponentProp, Expression, FieldTypeObjectProps, FieldTypeProp, ObjectPropTarget,
    ReferenceFieldTypeProp, ReferencedField, StructuredDataProp,
};
use crate::lexer::{
    COMPONENT_PREFIX, ENTITY_LEVEL, FIELD_ITEM_LEVEL, FIELD_LEVEL, FOLLOW_REFERENCE, OBJECT_CLOSE,
    OBJECT_OPEN, OBJECT_SEPARATOR, PROPERTY_LEVEL, STRUCTURED_DATA_PREFIX, USE_PROP,
};

pub fn serialize(expr: &Expression) -> String {
    let mut out = String::new();
    match expr {
        Expression::FieldTypeProp(e) => {
            out.push_str(STRUCTURED_DATA_PREFIX);
            write_field_type_prop(&mut out, e);
        }
        Expression::ReferenceFieldTypeProp(e) => {
            out.push_str(STRUCTURED_DATA_PREFIX);
            write_reference(&mut out, e);
        }
        Expression::FieldTypeObjectProps(e) => {
            out.push_str(STRUCTURED_DATA_PREFIX);
            write_object_props(&mut out, e);
        }
        Expression::StructuredDataProp(e) => {
            out.push_str(STRUCTURED_DATA_PREFIX);
            write_structured_data(&mut out, e);
        }
        Expression::ComponentProp(e) => write_component(&mut out, e),
    }
    out
}

fn write_field_type_prop(out: &mut String, e: &FieldTypeProp) {
    out.push_str(&e.field_type);
    out.push(PROPERTY_LEVEL);
    out.push_str(&e.prop_name);
}

fn write_reference(out: &mut String, e: &ReferenceFieldTypeProp) {
    write_field_type_prop(out, &e.base);
    write_reference_chain(out, &e.referenced, &e.referenced_prop_name);
}

/// `␜␜{entity}␝{field}␞␟{prop}`: the referenced side always addresses every
/// item, so the delta slot stays empty.
fn write_reference_chain(out: &mut String, referenced: &ReferencedField, prop_name: &str) {
    out.push(ENTITY_LEVEL);
    out.push(ENTITY_LEVEL);
    write_referenced_field(out, referenced);
    out.push(FIELD_ITEM_LEVEL);
    out.push(PROPERTY_LEVEL);
    out.push_str(prop_name);
}

pub(super) fn write_referenced_field(out: &mut String, referenced: &ReferencedField) {
    write_entity(out, &referenced.entity_type, referenced.bundle.as_deref());
    out.push(FIELD_LEVEL);
    out.push_str(&referenced.field_name);
}

fn write_entity(out: &mut String, entity_type: &str, bundle: Option<&str>) {
    out.push_str(entity_type);
    if let Some(bundle) = bundle {
        out.push(':');
        out.push_str(bundle);
    }
}

fn write_object_props(out: &mut String, e: &FieldTypeObjectProps) {
    out.push_str(&e.field_type);
    out.push(PROPERTY_LEVEL);
    out.push(OBJECT_OPEN);
    for (i, (source, target)) in e.prop_map.iter().enumerate() {
        if i > 0 {
            out.push(OBJECT_SEPARATOR);
        }
        out.push_str(source);
        match target {
            ObjectPropTarget::Prop(prop) => {
                out.push(USE_PROP);
                out.push_str(prop);
            }
            ObjectPropTarget::FollowReference {
                prop_name,
                referenced,
                referenced_prop_name,
            } => {
                out.push(FOLLOW_REFERENCE);
                out.push_str(prop_name);
                write_reference_chain(out, referenced, referenced_prop_name);
            }
        }
    }
    out.push(OBJECT_CLOSE);
}

fn write_structured_data(out: &mut String, e: &StructuredDataProp) {
    out.push(ENTITY_LEVEL);
    write_entity(out, &e.entity_type, e.bundle.as_deref());
    let Some(field) = &e.field else {
        return;
    };
    out.push(FIELD_LEVEL);
    out.push_str(&field.field_name);
    if field.delta.is_none() && field.prop_name.is_none() {
        return;
    }
    out.push(FIELD_ITEM_LEVEL);
    if let Some(delta) = field.delta {
        out.push_str(&delta.to_string());
    }
    if let Some(prop) = &field.prop_name {
        out.push(PROPERTY_LEVEL);
        out.push_str(prop);
    }
}

fn write_component(out: &mut String, e: &ComponentProp) {
    out.push(COMPONENT_PREFIX);
    out.push_str(&e.component_instance_uuid);
    out.push(PROPERTY_LEVEL);
    out.push_str(&e.prop_name);
}
