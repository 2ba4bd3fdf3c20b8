//! Client-side transforms per field widget.
//!
//! The editor turns raw widget form values back into prop values through a
//! list of named transforms. A resolved widget without any registered
//! transforms would leave its prop unreadable on the client, so resolved
//! shapes are checked against the registry in a separate pass.

use std::collections::BTreeMap;

use crate::error::MissingWidgetTransform;
use crate::resolver::StorableShape;

/// Widget name → ordered transform names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetTransformRegistry {
    transforms: BTreeMap<String, Vec<String>>,
}

impl WidgetTransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transforms for every widget the builtin rules can choose.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (widget, transforms) in [
            ("boolean_checkbox", &["mainProperty"][..]),
            ("datetime_default", &["mainProperty", "dateTime"][..]),
            ("daterange_default", &["mainProperty", "dateRange"][..]),
            ("email_default", &["mainProperty"][..]),
            ("image_image", &["mediaSelection", "mainProperty"][..]),
            ("link_default", &["mainProperty", "link"][..]),
            ("number", &["mainProperty"][..]),
            ("options_select", &["mainProperty", "firstRecord"][..]),
            ("string_textfield", &["mainProperty"][..]),
            ("text_textarea", &["mainProperty"][..]),
            ("uri", &["mainProperty"][..]),
        ] {
            registry.register(widget, transforms.iter().copied());
        }
        registry
    }

    /// Register (or replace) the transforms of `widget`.
    pub fn register<I, S>(&mut self, widget: impl Into<String>, transforms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transforms
            .insert(widget.into(), transforms.into_iter().map(Into::into).collect());
    }

    pub fn transforms(&self, widget: &str) -> Option<&[String]> {
        self.transforms.get(widget).map(Vec::as_slice)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }
}

/// Check that the widget of `storable` has at least one transform.
pub fn validate_widget_transforms(
    storable: &StorableShape,
    registry: &WidgetTransformRegistry,
) -> Result<(), MissingWidgetTransform> {
    match registry.transforms(storable.field_widget()) {
        Some(list) if !list.is_empty() => Ok(()),
        _ => Err(MissingWidgetTransform {
            widget: storable.field_widget().to_owned(),
        }),
    }
}
