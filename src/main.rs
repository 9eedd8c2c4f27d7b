//! # SQL Translator CLI (`sqlt`)
//!
//! ## Usage
//!
//! ```bash
//! sqlt --config ./config/sqlt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sqlt serve` | Start the HTTP translation server |
//! | `sqlt translate <gs-path>...` | Translate a batch and print JSON results |
//! | `sqlt corpus ensure` | Find or create the RAG corpus |
//!
//! ## Examples
//!
//! ```bash
//! # Translate two files without BigQuery validation
//! sqlt translate gs://in/a.sql gs://in/b.sql --no-dry-run
//!
//! # Verbose logs
//! RUST_LOG=sql_translator=debug sqlt serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use sql_translator::batch::Translator;
use sql_translator::config;
use sql_translator::models::TranslationRequest;
use sql_translator::server;

/// Batch Databricks-to-BigQuery SQL translator backed by Vertex AI RAG.
#[derive(Parser)]
#[command(name = "sqlt", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sqlt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Translate a batch of `gs://` SQL files and print the results as JSON.
    Translate {
        /// Input references, e.g. `gs://bucket/dir/query.sql`.
        paths: Vec<String>,

        /// Skip the BigQuery dry run.
        #[arg(long)]
        no_dry_run: bool,
    },

    /// Manage the retrieval corpus.
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// Find the corpus by display name, creating and populating it if absent.
    Ensure,
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new("sql_translator=info,sqlt=info,tower_http=info")
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let cfg = config::load_config(&cli.config)?;
    tracing::info!(
        "Loaded config for project {} ({})",
        cfg.gcp.project_id,
        cfg.gcp.location
    );
    let translator = Arc::new(Translator::from_config(&cfg)?);

    match cli.command {
        Commands::Serve => {
            server::run_server(translator).await?;
        }
        Commands::Translate { paths, no_dry_run } => {
            let request = TranslationRequest::new(paths, !no_dry_run);
            let results = translator.translate_batch(&request).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Corpus { action } => match action {
            CorpusAction::Ensure => {
                let corpus = translator.ensure_corpus().await?;
                println!("{} ({})", corpus.name, corpus.display_name);
            }
        },
    }

    Ok(())
}
