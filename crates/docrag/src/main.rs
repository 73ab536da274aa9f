//! # docrag CLI
//!
//! Ingest documents, then ask questions against one document at a time.
//! Each document is split into overlapping character windows, embedded, and
//! stored under its document id; a query returns the windows most similar
//! to the question.
//!
//! ## Commands
//!
//! - `docrag serve` - Run the HTTP service
//! - `docrag ingest <DOCUMENT_ID> <FILE>` - Ingest a local file
//! - `docrag query <DOCUMENT_ID> <QUERY>` - Query one document
//! - `docrag status` - Show store statistics
//! - `docrag config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Serve on the configured address
//! docrag serve --bind 0.0.0.0:8000
//!
//! # Ingest and query with a persistent store
//! docrag ingest 6f1c2a9e-0f5d-4f8e-9d6a-2b9f3c1d7e42 report.pdf
//! docrag query 6f1c2a9e-0f5d-4f8e-9d6a-2b9f3c1d7e42 "annual revenue" --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docrag::app::{create_store, App};
use docrag::config::{Config, StoreBackend};
use docrag::server::{self, AppState};
use docrag_core::DocumentId;
use docrag_index::IngestUpdate;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Document question answering over chunked embeddings")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docrag/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address (overrides config and DOCRAG_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Ingest a local file, replacing the document's previous chunks
    Ingest {
        /// Document identifier (UUID)
        document_id: DocumentId,

        /// File to ingest
        file: PathBuf,

        /// MIME type (default: guessed from the file name)
        #[arg(short, long)]
        mime: Option<String>,
    },

    /// Query one document
    Query {
        /// Document identifier (UUID)
        document_id: DocumentId,

        /// Query string
        query: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for query results.
#[derive(Serialize)]
struct QueryOutput {
    document_id: DocumentId,
    query: String,
    results: Vec<ResultItem>,
}

#[derive(Serialize)]
struct ResultItem {
    chunk_index: u32,
    score: f32,
    text: String,
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    backend: StoreBackend,
    total_documents: u64,
    total_chunks: u64,
    dimension: usize,
    metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.clone()).context("Failed to load config")?;

    // Setup logging: --verbose, then RUST_LOG, then the config file.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(config.server.bind);
            let app = App::from_config(&config)
                .await
                .context("Failed to initialize service")?;

            if config.store.backend == StoreBackend::Memory {
                warn!("Using the in-memory store; ingested documents are lost on exit");
            }

            let state = Arc::new(AppState { app });
            server::serve(state, bind, config.server.max_upload_bytes).await?;
        }

        Commands::Ingest {
            document_id,
            file,
            mime,
        } => {
            require_persistent(&config, "ingest")?;
            if !file.is_file() {
                anyhow::bail!("File does not exist: {}", file.display());
            }

            let app = App::from_config(&config)
                .await
                .context("Failed to initialize components")?;

            // Log progress events as they arrive
            let mut updates = app.ingest.subscribe();
            let progress_handle = tokio::spawn(async move {
                while let Ok(update) = updates.recv().await {
                    match update {
                        IngestUpdate::Started { document_id } => info!("Ingesting {}", document_id),
                        IngestUpdate::Indexed { chunk_count, .. } => {
                            info!("Stored {} chunks", chunk_count);
                        }
                        IngestUpdate::Failed { error, .. } => warn!("Ingestion failed: {}", error),
                    }
                }
            });

            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file.file_name().and_then(|n| n.to_str());

            let report = app
                .ingest
                .ingest(document_id, &data, mime.as_deref(), filename)
                .await
                .context("Ingestion failed")?;
            progress_handle.abort();

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    println!(
                        "Ingested {} as {} ({} chunks)",
                        file.display(),
                        report.document_id,
                        report.chunk_count
                    );
                }
            }
        }

        Commands::Query {
            document_id,
            query,
            limit,
        } => {
            require_persistent(&config, "query")?;

            let app = App::from_config(&config)
                .await
                .context("Failed to initialize components")?;

            let results = app
                .query
                .query_with_limit(document_id, &query, limit)
                .await
                .context("Query execution failed")?;

            match cli.format {
                OutputFormat::Json => {
                    let output = QueryOutput {
                        document_id,
                        query,
                        results: results
                            .into_iter()
                            .map(|r| ResultItem {
                                chunk_index: r.chunk_index,
                                score: r.score,
                                text: r.text,
                            })
                            .collect(),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Query: {query}\n");
                    for (i, result) in results.iter().enumerate() {
                        println!(
                            "{}. chunk {} (score: {:.3})",
                            i + 1,
                            result.chunk_index,
                            result.score
                        );
                        println!("   {}", truncate(&result.text, 100));
                        println!();
                    }
                }
            }
        }

        Commands::Status => {
            let store = create_store(&config).context("Failed to create store")?;
            store.init().await.context("Failed to initialize store")?;

            let stats = store.stats().await?;

            match cli.format {
                OutputFormat::Json => {
                    let output = StatusOutput {
                        backend: config.store.backend,
                        total_documents: stats.total_documents,
                        total_chunks: stats.total_chunks,
                        dimension: stats.dimension,
                        metric: stats.metric.to_string(),
                        last_updated: stats.last_updated.map(|t| t.to_rfc3339()),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Store Status ({:?})", config.store.backend);
                    if config.store.backend == StoreBackend::Lance {
                        if let Some(path) = config.store_path() {
                            println!("  Path:      {}", path.display());
                        }
                    }
                    println!("  Documents: {}", stats.total_documents);
                    println!("  Chunks:    {}", stats.total_chunks);
                    println!("  Vectors:   {} dims, {}", stats.dimension, stats.metric);
                    if let Some(last) = stats.last_updated {
                        println!("  Updated:   {}", last.format("%Y-%m-%d %H:%M:%S"));
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

/// One-shot commands need a store that outlives the process.
fn require_persistent(config: &Config, command: &str) -> Result<()> {
    if config.store.backend == StoreBackend::Memory {
        anyhow::bail!(
            "`docrag {command}` needs a persistent store; set store.backend = \"lance\" \
             or use `docrag serve`"
        );
    }
    Ok(())
}

/// Truncate a string to `max_chars` characters, adding ellipsis if needed.
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_chars {
        s
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
