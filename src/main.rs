//! # testwright CLI (`twx`)
//!
//! The `twx` binary drives the pipeline from the command line: build the
//! knowledge base from local files, generate test cases for a feature,
//! generate a script for one test case, or start the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! twx --config ./twx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `twx ingest <files…>` | Ingest local files into the knowledge base |
//! | `twx cases "<query>"` | Generate test cases for a feature query |
//! | `twx script <case.json>` | Generate an automation script for one test case |
//! | `twx serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Build the knowledge base from project docs
//! twx ingest docs/spec.md pages/checkout.html notes.txt
//!
//! # Ask for test cases
//! twx cases "discount code validation on checkout"
//!
//! # Turn a saved case into a script
//! twx script case.json > tc_dis_001.py
//!
//! # Serve the HTTP API for the frontend
//! twx serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use testwright::config::{self, Config};
use testwright::ingest::process_batch;
use testwright::llm::ChatCompleter;
use testwright::models::TestCase;
use testwright::script::generate_script;
use testwright::server;
use testwright::store::KnowledgeStore;
use testwright::testcase::generate_test_cases;

/// testwright — generate QA test cases and automation scripts from
/// project documentation.
///
/// All commands read settings from a TOML configuration file passed via
/// the global `--config` flag.
#[derive(Parser)]
#[command(
    name = "twx",
    about = "testwright — QA test cases and automation scripts from project documentation",
    version,
    long_about = "testwright ingests project artifacts (PDF, markdown, HTML, JSON, plain text) \
    into a vector knowledge base and uses retrieval-augmented generation to produce structured \
    test cases and executable Selenium scripts for a described web feature."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./twx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest local files into the knowledge base.
    ///
    /// Each file is normalized, chunked, embedded, and indexed. A file
    /// that fails is reported individually; the rest of the batch still
    /// goes through.
    Ingest {
        /// Files to ingest (.pdf, .md, .json, .html, .txt).
        files: Vec<PathBuf>,
    },

    /// Generate test cases for a feature described in natural language.
    ///
    /// Retrieves the most relevant indexed chunks and asks the model for
    /// a structured list of test cases, printed as JSON.
    Cases {
        /// Feature description, e.g. "discount code checkout".
        query: String,

        /// Compact single-line JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },

    /// Generate an automation script for one test case.
    ///
    /// Reads a single test-case record (as produced by `cases`) from a
    /// JSON file and prints the generated Python Selenium script.
    Script {
        /// Path to a JSON file holding one test-case record.
        test_case: PathBuf,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload and generation endpoints for the frontend.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { files } => run_ingest(&cfg, files).await?,
        Commands::Cases { query, compact } => run_cases(&cfg, &query, compact).await?,
        Commands::Script { test_case } => run_script(&cfg, &test_case).await?,
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}

async fn run_ingest(cfg: &Config, files: Vec<PathBuf>) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No files given. Usage: twx ingest <files…>");
    }

    let mut batch: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len());
    for path in &files {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        batch.push((filename, bytes));
    }

    let store = Arc::new(KnowledgeStore::from_config(cfg)?);
    let outcomes = process_batch(store, Arc::new(cfg.clone()), batch).await;

    println!("ingest");
    let mut failures = 0usize;
    for outcome in &outcomes {
        println!("  {}: {} ({})", outcome.filename, outcome.status, outcome.message);
        if outcome.status != "success" {
            failures += 1;
        }
    }
    let total_chunks: usize = outcomes.iter().map(|o| o.chunks).sum();
    println!("  chunks written: {}", total_chunks);
    if failures == 0 {
        println!("ok");
    } else {
        println!("completed with {} failed file(s)", failures);
    }
    Ok(())
}

async fn run_cases(cfg: &Config, query: &str, compact: bool) -> Result<()> {
    let store = KnowledgeStore::from_config(cfg)?;
    let llm = ChatCompleter::new(&cfg.llm)?;

    let cases = generate_test_cases(&store, &llm, query).await?;
    let rendered = if compact {
        serde_json::to_string(&cases)?
    } else {
        serde_json::to_string_pretty(&cases)?
    };
    println!("{}", rendered);
    Ok(())
}

async fn run_script(cfg: &Config, path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let test_case: TestCase = serde_json::from_str(&content)
        .with_context(|| format!("{} does not contain a test-case record", path.display()))?;

    let store = KnowledgeStore::from_config(cfg)?;
    let llm = ChatCompleter::new(&cfg.llm)?;

    let script = generate_script(&store, &llm, &test_case).await?;
    println!("{}", script);
    Ok(())
}
