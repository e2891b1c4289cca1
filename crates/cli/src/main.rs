use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use workflowscript_core::{compile, render, CompileError, CompileOptions, ValidatorKind};

/// Format of the compiled document on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

/// Format of error reports on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorFormat {
    Text,
    Json,
}

/// WorkflowScript to workflow YAML compiler.
#[derive(Parser)]
#[command(
    name = "workflowscript",
    version,
    about = "Compile WorkflowScript source into a workflow definition"
)]
struct Cli {
    /// Path to the WorkflowScript source file
    file: Option<PathBuf>,

    /// Validators to disable (repeatable or comma-separated)
    #[arg(long = "disable", value_name = "VALIDATOR", value_delimiter = ',')]
    disable: Vec<ValidatorKind>,

    /// Output format (yaml or json)
    #[arg(long, default_value = "yaml", value_enum)]
    output: OutputFormat,

    /// Error report format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    error_format: ErrorFormat,

    /// Log pipeline stages to stderr
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(file) = cli.file.as_deref() else {
        eprintln!("{}", Cli::command().render_usage());
        process::exit(1);
    };

    let options = cli
        .disable
        .iter()
        .fold(CompileOptions::new(), |options, kind| options.disable(*kind));
    cmd_compile(file, &options, cli.output, cli.error_format);
}

fn cmd_compile(file: &Path, options: &CompileOptions, output: OutputFormat, errors: ErrorFormat) {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let message = format!("cannot read {}: {}", file.display(), e);
            match errors {
                ErrorFormat::Json => eprintln!(
                    "{}",
                    serde_json::json!({ "kind": "IoError", "message": message })
                ),
                ErrorFormat::Text => eprintln!("error: {}", message),
            }
            process::exit(1);
        }
    };

    tracing::debug!(path = %file.display(), bytes = source.len(), "compiling");
    let rendered = compile(&source, options).and_then(|document| match output {
        OutputFormat::Yaml => render::to_yaml(&document),
        OutputFormat::Json => serde_json::to_string_pretty(&document)
            .map(|s| s + "\n")
            .map_err(|e| CompileError::Yaml(e.to_string())),
    });

    match rendered {
        Ok(text) => print!("{}", text),
        Err(e) => {
            report(&e, errors);
            process::exit(1);
        }
    }
}

fn report(e: &CompileError, errors: ErrorFormat) {
    match errors {
        ErrorFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"kind\": \"{}\"}}", e.kind()));
            eprintln!("{}", err_json);
        }
        ErrorFormat::Text => eprintln!("{}: {}", e.kind(), e),
    }
}
