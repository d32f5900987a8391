use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod models;
mod output;
mod prompts;
mod providers;
mod registry;
mod runner;
mod store;

use crate::config::{Config, SourceKind};
use crate::models::Prompt;
use crate::output::OutputFormat;
use crate::registry::{Credentials, ProviderRegistry};
use crate::runner::{Runner, RunnerOptions};
use crate::store::{MemoryStore, MongoStore, PromptStore, ResponseStore};

/// Benchmark harvester - send every prompt to every configured model and store the answers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used when omitted.
    config: Option<PathBuf>,

    /// Where to read prompts from
    #[arg(long)]
    source: Option<SourceKind>,

    /// CSV file with a `question` column
    #[arg(long)]
    csv: Option<String>,

    /// MongoDB connection string
    #[arg(long)]
    mongo_uri: Option<String>,

    /// Read at most this many prompts from the store
    #[arg(long)]
    limit: Option<u64>,

    /// Keep records in memory and print them instead of writing to MongoDB
    #[arg(long)]
    dry_run: bool,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log progress for each API request
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(source) = self.source {
            config.prompts.source = source;
        }
        if let Some(path) = &self.csv {
            config.prompts.csv_path = path.clone();
        }
        if let Some(uri) = &self.mongo_uri {
            config.store.uri = uri.clone();
        }
        if self.limit.is_some() {
            config.prompts.limit = self.limit;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let credentials = Credentials::from_env(&config.credentials);
    let registry = ProviderRegistry::build(&config, &credentials)?;

    // One client per run, shared by prompt reads and record writes
    let mongo = if needs_database(&config, args.dry_run) {
        Some(Arc::new(connect(&config).await?))
    } else {
        None
    };
    let prompts = load_prompts(
        &config,
        mongo.as_deref().map(|store| store as &dyn PromptStore),
    )
    .await?;

    let dry_run_store = args.dry_run.then(|| Arc::new(MemoryStore::new()));
    let sink = response_sink(dry_run_store.clone(), mongo)?;

    let runner = Runner::new(
        registry,
        config.collections.clone(),
        sink,
        RunnerOptions::from(&config.runner),
    )?;
    let summary = runner.run(&prompts).await;

    if let Some(memory) = dry_run_store {
        output::print_records(&memory.snapshot(), args.output);
    }
    output::print_summary(&summary, args.output);

    Ok(())
}

/// The database is needed to read prompts from it or to write records to it
fn needs_database(config: &Config, dry_run: bool) -> bool {
    config.prompts.source == SourceKind::Store || !dry_run
}

async fn load_prompts(
    config: &Config,
    store: Option<&dyn PromptStore>,
) -> anyhow::Result<Vec<Prompt>> {
    let prompts = match config.prompts.source {
        SourceKind::Csv => {
            prompts::load_from_table(Path::new(&config.prompts.csv_path), &config.prompts.column)?
        }
        SourceKind::Store => {
            let store = store.context("Reading prompts from the store needs a database connection")?;
            prompts::load_from_store(
                store,
                &config.prompts.collection,
                &config.prompts.column,
                config.prompts.limit,
            )
            .await?
        }
    };

    info!(count = prompts.len(), source = ?config.prompts.source, "Prompts ready");
    Ok(prompts)
}

/// Dry runs write to memory, everything else to the shared database handle
fn response_sink(
    dry_run: Option<Arc<MemoryStore>>,
    mongo: Option<Arc<MongoStore>>,
) -> anyhow::Result<Arc<dyn ResponseStore>> {
    match (dry_run, mongo) {
        (Some(memory), _) => Ok(memory),
        (None, Some(mongo)) => Ok(mongo),
        (None, None) => anyhow::bail!("Writing records needs a database connection"),
    }
}

async fn connect(config: &Config) -> anyhow::Result<MongoStore> {
    MongoStore::connect(&config.store)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", config.store.database))
}
