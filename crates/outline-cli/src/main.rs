//! `outline`: inspect, repair and convert nested heading outlines.
//!
//! # Usage
//!
//! ```bash
//! outline check notes.md
//! outline fix broken.json -o fixed.json
//! outline tree notes.md
//! outline convert notes.md --to json
//! ```
//!
//! Files ending in `.json` are read as the JSON document form; everything else is read as outline
//! text (`#` headings, paragraphs, `- ` lists, `> ` quotes). Log output goes to stderr and is
//! filtered by the `OUTLINE_LOG` environment variable (for example `OUTLINE_LOG=debug`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use outline_core::error::SchemaError;
use outline_core::{
    Document, EngineConfig, HierarchyValidator, IdGenerator, document_from_json, document_to_json,
    find_violations, parse_outline, to_outline,
};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outline")]
#[command(about = "Inspect and repair nested heading outlines", long_about = None)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Report hierarchy violations; exits with status 1 when there are any
    Check {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Repair hierarchy violations
    Fix {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Write the result here instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
        /// Output format (defaults to the input format)
        #[arg(long, value_enum)]
        to: Option<Format>,
    },
    /// Print the heading tree
    Tree {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Convert between outline text and JSON
    Convert {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(long, value_enum)]
        to: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Outline,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Outline,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json_str(&read(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_document(path: &Path, config: &EngineConfig) -> Result<Document, CliError> {
    let text = read(path)?;
    let doc = match Format::of(path) {
        Format::Json => document_from_json(&text).map_err(|source| CliError::Schema {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Outline => parse_outline(&text, &mut IdGenerator::new(config.id_prefix.clone())),
    };
    debug!(path = %path.display(), size = doc.size(), "document loaded");
    Ok(doc)
}

fn render(doc: &Document, format: Format, path: &Path) -> Result<String, CliError> {
    match format {
        Format::Json => document_to_json(doc)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|source| CliError::Schema {
                path: path.to_path_buf(),
                source,
            }),
        Format::Outline => Ok(to_outline(doc)),
    }
}

fn emit(text: &str, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, text).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn run(args: Args) -> Result<ExitCode, CliError> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Action::Check { path } => {
            let doc = load_document(&path, &config)?;
            let violations = find_violations(&doc);
            for violation in &violations {
                println!(
                    "{}: {:?} heading '{}' (level {}) at {}",
                    path.display(),
                    violation.kind,
                    violation.heading.id,
                    violation.heading.level,
                    violation.heading.start
                );
            }
            if violations.is_empty() {
                info!(path = %path.display(), "outline is valid");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Action::Fix { path, output, to } => {
            let doc = load_document(&path, &config)?;
            let fixed = HierarchyValidator::new(&config)
                .validate(&doc)
                .unwrap_or(doc);
            let format = to.unwrap_or_else(|| Format::of(&path));
            emit(&render(&fixed, format, &path)?, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Action::Tree { path } => {
            let doc = load_document(&path, &config)?;
            for line in doc.outline() {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Action::Convert { path, to } => {
            let doc = load_document(&path, &config)?;
            emit(&render(&doc, to, &path)?, None)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("OUTLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(2)
        }
    }
}
