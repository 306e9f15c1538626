mod catalog;
mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog::CatalogFormatter;
use clap::{Parser, Subcommand};
use config::CliConfig;
use field_engine::{
    Document, DocumentSpec, Field, FieldContext, Persistence, TaskOutcome, resolve_visibility,
};
use field_store::InMemoryBackend;
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form document CLI",
    long_about = "Inspects, validates and fills form documents with the reactive field engine"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, value_name = "CONFIG", default_value = "formfield.toml")]
    config: PathBuf,
    /// Log engine activity to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the fields of a document with their derived state.
    Inspect {
        /// Path to the document JSON (questions plus answers).
        #[arg(long, value_name = "DOCUMENT")]
        document: PathBuf,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Validate every field of a document.
    Validate {
        /// Path to the document JSON.
        #[arg(long, value_name = "DOCUMENT")]
        document: PathBuf,
        /// Answer to apply before validating, as `slug=value`.
        #[arg(long = "set", value_name = "SLUG=VALUE")]
        sets: Vec<String>,
    },
    /// Apply answers, save them and print the resulting answers.
    Fill {
        /// Path to the document JSON.
        #[arg(long, value_name = "DOCUMENT")]
        document: PathBuf,
        /// Answer to apply and save, as `slug=value`.
        #[arg(long = "set", value_name = "SLUG=VALUE")]
        sets: Vec<String>,
        /// Write the answer snapshot to this file instead of stdout.
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
        /// Encode the snapshot as CBOR (requires --out).
        #[arg(long, requires = "out")]
        cbor: bool,
    },
    /// Print the JSON schema of the document payload.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = CliConfig::load(&cli.config)?;
    debug!(config = %cli.config.display(), locale = %config.locale, "configuration loaded");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match cli.command {
        Command::Inspect { document, json } => run_inspect(&config, &document, json),
        Command::Validate { document, sets } => {
            runtime.block_on(run_validate(&config, &document, &sets))
        }
        Command::Fill {
            document,
            sets,
            out,
            cbor,
        } => runtime.block_on(run_fill(&config, &document, &sets, out.as_deref(), cbor)),
        Command::Schema => run_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_document(
    config: &CliConfig,
    path: &Path,
    persistence: Arc<dyn Persistence>,
) -> CliResult<Arc<Document>> {
    let raw = fs::read_to_string(path)?;
    let mut payload: Value = serde_json::from_str(&raw)?;
    if let Some(object) = payload.as_object_mut() {
        object
            .entry("id")
            .or_insert_with(|| Value::String(config.document_id.clone()));
    }
    let spec: DocumentSpec = serde_json::from_value(payload)?;
    let formatter = CatalogFormatter::new(&config.locale, &config.messages)?;
    let context = FieldContext::new(persistence).with_formatter(Arc::new(formatter));
    Ok(Document::build(&context, spec)?)
}

/// Splits `slug=value`; the value is read as JSON and falls back to a plain
/// string.
fn parse_assignment(raw: &str) -> CliResult<(String, Value)> {
    let (slug, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SLUG=VALUE, got '{raw}'"))?;
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(format!("missing question slug in '{raw}'").into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((slug.to_string(), value))
}

async fn apply_assignments(
    document: &Arc<Document>,
    sets: &[String],
) -> CliResult<Vec<Arc<Field>>> {
    let mut touched = Vec::with_capacity(sets.len());
    for raw in sets {
        let (slug, value) = parse_assignment(raw)?;
        let field = document
            .field(&slug)
            .ok_or_else(|| format!("unknown question '{slug}'"))?;
        if !field.has_answer() {
            return Err(format!("question '{slug}' does not take answers").into());
        }
        field.set_value(value).settled().await;
        touched.push(field);
    }
    Ok(touched)
}

fn run_inspect(config: &CliConfig, path: &Path, as_json: bool) -> CliResult<()> {
    let document = load_document(config, path, Arc::new(InMemoryBackend::new()))?;
    let fields = document.all_fields();

    if as_json {
        let rows: Vec<Value> = fields
            .iter()
            .map(|field| {
                json!({
                    "id": field.id(),
                    "slug": field.question().slug(),
                    "label": field.question().label(),
                    "type": field.question_type(),
                    "hidden": field.hidden(),
                    "optional": field.optional(),
                    "isNew": field.is_new(),
                    "visibleInNavigation": field.visible_in_navigation(),
                    "value": field.value(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Document {}", document.id());
    for field in &fields {
        let mut flags = Vec::new();
        if field.hidden() {
            flags.push("hidden");
        }
        if !field.optional() {
            flags.push("required");
        }
        if field.visible_in_navigation() {
            flags.push("nav");
        }
        let value = if field.has_answer() {
            field.value().to_string()
        } else {
            "-".to_string()
        };
        println!(
            "  {:<24} {:<22} {:<20} {}",
            field.question().slug(),
            field.question_type(),
            flags.join(","),
            value
        );
    }
    let visible = resolve_visibility(&document)
        .values()
        .filter(|visible| **visible)
        .count();
    println!("{visible} of {} questions visible", fields.len());
    Ok(())
}

async fn run_validate(config: &CliConfig, path: &Path, sets: &[String]) -> CliResult<()> {
    let document = load_document(config, path, Arc::new(InMemoryBackend::new()))?;
    apply_assignments(&document, sets).await?;

    let valid = document.validate_all().await;
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    for field in document.all_fields() {
        for message in field.error_messages() {
            println!("  {} - {}", field.question().slug(), message);
        }
    }

    if valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

async fn run_fill(
    config: &CliConfig,
    path: &Path,
    sets: &[String],
    out: Option<&Path>,
    cbor: bool,
) -> CliResult<()> {
    let backend = Arc::new(InMemoryBackend::new());
    let document = load_document(config, path, backend.clone())?;
    let touched = apply_assignments(&document, sets).await?;

    for field in &touched {
        if let TaskOutcome::Committed(errors) = field.validate().await
            && !errors.is_empty()
        {
            let messages = field.error_messages().join("; ");
            return Err(format!("{}: {messages}", field.question().slug()).into());
        }
        field.save().await?;
    }
    debug!(saved = backend.len(), mutations = backend.mutations().len(), "answers saved");

    let snapshot = document.snapshot();
    match out {
        Some(out) if cbor => fs::write(out, snapshot.to_cbor()?)?,
        Some(out) => fs::write(out, snapshot.to_json_pretty()?)?,
        None => println!("{}", snapshot.to_json_pretty()?),
    }
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(DocumentSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
