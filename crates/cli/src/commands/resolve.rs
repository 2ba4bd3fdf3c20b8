use std::path::Path;
use std::process;

use propshape_core::{normalize, validate_widget_transforms, PropFieldSettings};
use serde_json::json;

use crate::config::Config;
use crate::{print_json, read_json, report_error, OutputFormat};

pub(crate) fn cmd_resolve(file: &Path, config: &Config, output: OutputFormat, quiet: bool) {
    let raw = read_json(file, output, quiet);
    let shape = match normalize(&raw) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("{}: {}", file.display(), e), output, quiet);
            process::exit(1);
        }
    };
    let resolver = match config.resolver() {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let storable = match resolver.resolve(&shape) {
        Ok(Some(s)) => s,
        Ok(None) => {
            match output {
                OutputFormat::Json => print_json(&json!({ "storable": null })),
                OutputFormat::Text => println!("no storable mapping"),
            }
            return;
        }
        Err(e) => {
            report_error(&format!("invariant violation: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let settings = PropFieldSettings::from(&storable);
    match output {
        OutputFormat::Json => print_json(&json!({ "storable": settings })),
        OutputFormat::Text => {
            println!("field type prop: {}", settings.field_type_prop);
            println!("field widget: {}", settings.field_widget);
            if let Some(c) = settings.cardinality {
                println!("cardinality: {}", c);
            }
            if !quiet {
                if let Some(s) = &settings.field_storage_settings {
                    println!("field storage settings: {}", json!(s));
                }
                if let Some(s) = &settings.field_instance_settings {
                    println!("field instance settings: {}", json!(s));
                }
            }
        }
    }

    if let Err(e) = validate_widget_transforms(&storable, &config.widget_transforms()) {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }
}
