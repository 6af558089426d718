//! `batchsave` - submit a saved draft to the batch endpoint
//!
//! ## Usage
//!
//! ```bash
//! # Save one entity
//! batchsave save --table counterparties --file draft.json
//!
//! # Main entity first, then its bank accounts
//! batchsave save-steps --table counterparties --related-table counterparty_banks \
//!     --parent-field counterparty_id --display-field counterparty_name --file draft.json
//!
//! # Render a stored failure
//! batchsave report --file error.json
//!
//! # Show the effective configuration
//! batchsave config --server https://agro.example.com
//! ```
//!
//! Draft files hold `{"entity": {...}, "related": [{...}, ...]}`.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use batchsave::logging::init_tracing;
use batchsave::{
    generate_error_report, BatchSaveOrchestrator, Config, HttpTransport, Record, SaveDependency,
    SaveErrorData, SaveOptions, SaveOutcome, SaveResult, WireSchema,
};

#[derive(Parser)]
#[command(name = "batchsave", version, about = "Batch save client")]
struct Cli {
    /// Configuration file (defaults to batchsave.toml + batchsave.local.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save the main entity only
    Save(SaveArgs),
    /// Save main and related rows in one request
    SaveRelated(SaveArgs),
    /// Save main, then related rows in a second request
    SaveSteps(SaveArgs),
    /// Print the report for a SaveErrorData JSON file
    Report {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct SaveArgs {
    #[arg(long)]
    table: String,

    #[arg(long, default_value = "")]
    related_table: String,

    /// FK column on related rows
    #[arg(long)]
    parent_field: Option<String>,

    /// Joined parent column to strip from related rows (repeatable)
    #[arg(long = "display-field")]
    display_fields: Vec<String>,

    /// Field always sent as text (repeatable)
    #[arg(long = "text-field")]
    text_fields: Vec<String>,

    #[arg(long)]
    file: PathBuf,
}

#[derive(Deserialize)]
struct Draft {
    entity: Record,
    #[serde(default)]
    related: Vec<Record>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).map_err(|e| anyhow!("loading {path}: {e}"))?,
        None => config_or_default(Config::load()),
    };
    if let Some(server) = cli.server {
        config.api.base_url = server;
    }
    init_tracing(&config.logging);

    match cli.command {
        Command::Report { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let data: SaveErrorData = serde_json::from_str(&text)?;
            print!("{}", generate_error_report(&data, None));
            Ok(())
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Save(args) => run(&config, &args, Mode::Single).await,
        Command::SaveRelated(args) => run(&config, &args, Mode::Related).await,
        Command::SaveSteps(args) => run(&config, &args, Mode::Steps).await,
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Single,
    Related,
    Steps,
}

async fn run(config: &Config, args: &SaveArgs, mode: Mode) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let draft: Draft = serde_json::from_str(&text).context("parsing draft")?;

    let orchestrator = BatchSaveOrchestrator::from_config(config)?;
    let options = options_from(args);

    match save(&orchestrator, &draft, args, mode, &options).await {
        Ok(outcome) => {
            println!("Saved {}: id {:?}", args.table, outcome.main_id);
            for (idx, id) in outcome.related_ids.iter().enumerate() {
                println!("  {} #{}: id {:?}", args.related_table, idx + 1, id);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.report());
            if let Some(main_id) = e.committed_main_id() {
                eprintln!(
                    "Main entity was saved with id {main_id}; only the related rows need a retry."
                );
            } else if e.main_committed() {
                eprintln!("Main entity was saved; look up its id before sending the related rows.");
            }
            bail!("save failed ({})", e.kind())
        }
    }
}

async fn save(
    orchestrator: &BatchSaveOrchestrator<HttpTransport>,
    draft: &Draft,
    args: &SaveArgs,
    mode: Mode,
    options: &SaveOptions,
) -> SaveResult<SaveOutcome> {
    let dependencies: Vec<SaveDependency> = args
        .parent_field
        .iter()
        .map(|field| SaveDependency::on_main(args.related_table.clone(), field.clone()))
        .collect();

    match mode {
        Mode::Single => orchestrator.save_entity(&draft.entity, &args.table, options).await,
        Mode::Related => {
            orchestrator
                .save_entity_with_related(
                    &draft.entity,
                    &draft.related,
                    &args.table,
                    &args.related_table,
                    &dependencies,
                    options,
                )
                .await
        }
        Mode::Steps => {
            orchestrator
                .save_entity_with_steps(
                    &draft.entity,
                    &draft.related,
                    &args.table,
                    &args.related_table,
                    &dependencies,
                    options,
                )
                .await
        }
    }
}

/// Defaults for an unreadable config file or env override, with the error on stderr.
fn config_or_default(loaded: Result<Config, figment::Error>) -> Config {
    loaded.unwrap_or_else(|e| {
        eprintln!("Warning: ignoring invalid configuration ({e}); using defaults");
        Config::default()
    })
}

fn options_from(args: &SaveArgs) -> SaveOptions {
    let schema = args
        .text_fields
        .iter()
        .fold(WireSchema::new(), |schema, field| schema.with_text_field(field.clone()));
    SaveOptions {
        main_schema: schema.clone(),
        related_schema: schema,
        parent_id_field: args.parent_field.clone(),
        display_fields: args.display_fields.clone(),
        ..SaveOptions::default()
    }
}
