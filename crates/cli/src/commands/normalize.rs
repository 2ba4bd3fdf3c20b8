use std::path::Path;
use std::process;

use propshape_core::{dedup_key, normalize};
use serde_json::json;

use crate::{print_json, read_json, report_error, OutputFormat};

pub(crate) fn cmd_normalize(file: &Path, output: OutputFormat, quiet: bool) {
    let raw = read_json(file, output, quiet);
    let shape = match normalize(&raw) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("{}: {}", file.display(), e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&json!({
            "shape": shape.to_value(),
            "dedup_key": dedup_key(&shape),
        })),
        OutputFormat::Text => {
            print_json(&shape.to_value());
            if !quiet {
                println!("dedup key: {}", dedup_key(&shape));
            }
        }
    }
}
