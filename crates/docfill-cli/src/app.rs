//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::info;

use docfill_core::{HealthReport, Orchestrator, RenderContext, Settings, TargetFormat};

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "docfill.toml";

/// Output format of the generated document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// The filled DOCX, as produced by the renderer
    #[default]
    #[value(alias = "native")]
    Docx,
    /// A paginated PDF produced by the configured converter
    Pdf,
}

impl From<Format> for TargetFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Docx => TargetFormat::Docx,
            Format::Pdf => TargetFormat::Pdf,
        }
    }
}

#[derive(Parser)]
#[command(name = "docfill")]
#[command(author, version, about = "Fill DOCX templates, optionally as PDF", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./docfill.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the template, overriding the configuration
    #[arg(long, global = true)]
    template_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the template with a JSON payload
    Generate {
        /// JSON data file, or `-` for stdin
        #[arg(short, long)]
        data: String,

        /// Output format (docx or pdf)
        #[arg(short, long, value_enum, default_value = "docx")]
        format: Format,

        /// Output file (defaults to the configured filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the resolved template and converter availability
    Check,
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.template_dir.as_deref())?;

    match cli.command {
        Commands::Generate {
            data,
            format,
            output,
        } => {
            generate_command(&settings, &data, format, output.as_deref())?;
        }
        Commands::Check => {
            let report = check_command(&settings);
            if !report.is_ready() {
                bail!("docfill is not ready to generate documents");
            }
        }
    }

    Ok(())
}

/// Resolve settings from the config file, the environment and flags
///
/// An explicit `config` must exist; otherwise `./docfill.toml` is used when
/// present and the defaults when not.
pub fn load_settings(config: Option<&Path>, template_dir: Option<&Path>) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Settings::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load configuration: {DEFAULT_CONFIG_FILE}"))?
        }
        None => Settings::default(),
    };

    settings
        .apply_env()
        .context("Invalid environment override")?;

    if let Some(dir) = template_dir {
        settings.template.dir = dir.to_path_buf();
    }
    Ok(settings)
}

/// Parse the request payload into a render context
///
/// Accepts a JSON object, or a JSON string whose content is an object.
pub fn parse_context(raw: &str) -> Result<RenderContext> {
    let value: Value = serde_json::from_str(raw).context("Data is not valid JSON")?;
    let value = match value {
        Value::String(inner) => {
            serde_json::from_str(&inner).context("Data string does not contain valid JSON")?
        }
        other => other,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => bail!("Data must be a JSON object, found an array"),
        _ => bail!("Data must be a JSON object, found a scalar"),
    }
}

fn read_data(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read data from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(source).with_context(|| format!("Failed to read data file: {source}"))
}

/// Execute the generate command, returning the path written
pub fn generate_command(
    settings: &Settings,
    data: &str,
    format: Format,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let context = parse_context(&read_data(data)?)?;
    let orchestrator = Orchestrator::from_settings(settings);
    let target = TargetFormat::from(format);

    let document = orchestrator.generate(&context, target).map_err(|e| {
        let what = if e.is_caller_error() {
            "The data does not fit the template"
        } else {
            "Document generation failed"
        };
        anyhow::Error::new(e).context(what)
    })?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&document.filename));
    fs::write(&path, &document.bytes)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;

    info!(
        path = %path.display(),
        bytes = document.bytes.len(),
        content_type = document.content_type,
        "document written"
    );
    println!("Wrote {} ({})", path.display(), document.content_type);
    Ok(path)
}

/// Execute the check command
pub fn check_command(settings: &Settings) -> HealthReport {
    let report = Orchestrator::from_settings(settings).check();

    println!("docfill v{}", docfill_core::VERSION);
    println!("Template directory: {}", report.template_dir.display());
    match &report.template {
        Some(path) => println!("Template: {}", path.display()),
        None => println!("Template: not found"),
    }
    if let Some(error) = &report.template_error {
        println!("Template error: {error}");
    } else if !report.placeholders.is_empty() {
        println!("Placeholders: {}", report.placeholders.join(", "));
    }
    println!(
        "Converter: {} ({})",
        report.backend,
        if report.backend_available {
            "available"
        } else {
            "unavailable"
        }
    );

    report
}
