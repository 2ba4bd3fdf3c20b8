mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_normalize, cmd_parse, cmd_resolve, cmd_version};
use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Prop expression and storable prop shape tooling.
#[derive(Parser)]
#[command(
    name = "propshape",
    version,
    about = "Prop expression and storable prop shape tooling"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log resolution decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path to a propshape.toml config file (default: ./propshape.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a prop expression and describe it
    Parse {
        /// The expression, e.g. 'ℹ︎link␟url'
        expression: String,
    },

    /// Normalize a raw prop shape and print its dedup key
    Normalize {
        /// Path to the raw prop shape JSON file
        file: PathBuf,
    },

    /// Resolve a prop shape to its storage mapping
    Resolve {
        /// Path to the raw prop shape JSON file
        file: PathBuf,
    },

    /// Resolve every prop of a component and print its versioned settings
    Version {
        /// Path to the component JSON file: { "props": { name: shape } }
        file: PathBuf,
        /// Component id (default: the file stem)
        #[arg(long)]
        component: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Parse { expression } = &cli.command {
        cmd_parse(expression, cli.output, cli.quiet);
        return;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse { .. } => {}
        Commands::Normalize { file } => {
            cmd_normalize(&file, cli.output, cli.quiet);
        }
        Commands::Resolve { file } => {
            cmd_resolve(&file, &config, cli.output, cli.quiet);
        }
        Commands::Version { file, component } => {
            let component_id = component.unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "component".to_string())
            });
            cmd_version(&file, &component_id, &config, cli.output, cli.quiet);
        }
    }
}

/// Read and parse a JSON file, exiting with a reported error on failure.
pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let src = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&src) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
