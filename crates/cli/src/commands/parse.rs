use std::process;

use propshape_core::parse;

use crate::{print_json, report_error, OutputFormat};

pub(crate) fn cmd_parse(expression: &str, output: OutputFormat, quiet: bool) {
    let expr = match parse(expression) {
        Ok(e) => e,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    let mut description = expr.describe();
    if let Some(map) = description.as_object_mut() {
        map.insert("canonical".to_string(), expr.to_string().into());
        map.insert(
            "field_type_expression".to_string(),
            expr.is_field_type_expression().into(),
        );
    }

    match output {
        OutputFormat::Json => print_json(&description),
        OutputFormat::Text => {
            println!("{}: {}", expr.kind().as_str(), expr);
            if quiet {
                return;
            }
            if let Some(map) = description.as_object() {
                for (key, value) in map {
                    if matches!(key.as_str(), "kind" | "canonical") || value.is_null() {
                        continue;
                    }
                    println!("  {}: {}", key, value);
                }
            }
        }
    }
}
