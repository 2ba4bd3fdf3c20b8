use std::path::Path;
use std::process;
use std::sync::Arc;

use propshape_core::validate_widget_transforms;
use propshape_storage::{ComponentSource, ComponentVersioner, MemoryShapeStore};
use serde_json::json;

use crate::config::Config;
use crate::{print_json, read_json, report_error, OutputFormat};

pub(crate) fn cmd_version(
    file: &Path,
    component_id: &str,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let raw = read_json(file, output, quiet);
    let source: ComponentSource = match serde_json::from_value(raw) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!(
                "'{}' is not a component source ({{ \"props\": {{ name: shape }} }}): {}",
                file.display(),
                e
            );
            report_error(&msg, output, quiet);
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

    let versioner = ComponentVersioner::new(Arc::new(MemoryShapeStore::new()), resolver);
    let resolved = match versioner.resolve(&source) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let transforms = config.widget_transforms();
    for (prop, storable) in &resolved.storables {
        if let Err(e) = validate_widget_transforms(storable, &transforms) {
            report_error(&format!("prop '{}': {}", prop, e), output, quiet);
            process::exit(1);
        }
    }
    let unbound: Vec<String> = resolved.unbound_props().map(str::to_string).collect();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let version = match rt.block_on(versioner.store_version(component_id, resolved)) {
        Ok(v) => v,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&json!({
            "component_id": version.component_id,
            "version_id": version.version_id,
            "settings": version.settings,
            "unbound_props": unbound,
        })),
        OutputFormat::Text => {
            println!("{}@{}", version.component_id, version.version_id);
            print_json(&json!(version.settings));
            if !quiet && !unbound.is_empty() {
                println!("unbound props: {}", unbound.join(", "));
            }
        }
    }
}
