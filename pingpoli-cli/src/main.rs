//! PingPoli CLI - ask questions about the team
//!
//! # Commands
//!
//! ```bash
//! # Rebuild the embedding store from a directory of documents
//! pingpoli ingest data/raw
//!
//! # Show the documents closest to a query
//! pingpoli search "quem é o capitão?" -k 3
//!
//! # Answer a question with retrieved context (needs GROQ_API_KEY)
//! pingpoli ask "Quando é o próximo torneio?"
//!
//! # Store summary
//! pingpoli stats
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pingpoli_lib::{
    complete::GroqCompleter,
    config::{Config, CONFIG_FILE},
    embed::FastEmbedder,
    ingest::{IngestionPipeline, SourceDir},
    retrieve::RetrievalService,
    store::{EmbeddingStore, JsonlStore},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pingpoli")]
#[command(about = "Question answering over the PingPoli team knowledge base")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "PINGPOLI_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the embedding store from a directory of documents
    Ingest {
        /// Directory to read (defaults to ingest.source_dir)
        dir: Option<PathBuf>,
    },

    /// Show the documents most similar to a query
    Search {
        /// Query text
        query: String,

        /// Number of results to return (defaults to retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question using retrieved documents as context
    Ask {
        /// The question
        question: String,

        /// Number of documents to retrieve (defaults to retrieval.k)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show what the store holds
    Stats,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config) -> Result<JsonlStore> {
    JsonlStore::open_existing(&config.store.path).with_context(|| {
        format!(
            "failed to open store at {}; run `pingpoli ingest` first",
            config.store.path.display()
        )
    })
}

fn ensure_populated(store: &dyn EmbeddingStore, path: &Path) -> Result<()> {
    if store.is_empty() {
        bail!("store at '{}' is empty; run `pingpoli ingest` first", path.display());
    }
    Ok(())
}

fn load_embedder(config: &Config) -> Result<FastEmbedder> {
    info!(model = config.embedding.model.model_name(), "loading embedding model");
    FastEmbedder::new(config.embedding.model).context("failed to load embedding model")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Ingest { dir } => {
            let dir = dir.unwrap_or_else(|| config.ingest.source_dir.clone());
            let source = SourceDir::open(&dir)
                .with_context(|| format!("failed to list {}", dir.display()))?;
            println!("Found {} documents in '{}'", source.len(), dir.display());

            let mut pipeline = IngestionPipeline::new(load_embedder(&config)?);
            let mut store = JsonlStore::staged(&config.store.path)?;
            let report = match pipeline.run(&mut store, source) {
                Ok(report) => report,
                Err(e) => {
                    if let Err(cleanup) = store.discard() {
                        warn!(error = %cleanup, "could not remove staging file");
                    }
                    return Err(e).context("ingestion failed, previous store left in place");
                }
            };
            let store = store.commit()?;

            println!(
                "Indexed {} documents ({} dimensions) into '{}'",
                report.inserted,
                report.dimension.unwrap_or_default(),
                store.path().display()
            );
        }

        Commands::Search { query, k } => {
            let k = k.unwrap_or(config.retrieval.k);
            let store = open_store(&config)?;
            let mut service = RetrievalService::new(load_embedder(&config)?);

            let results = service.search(&store, &query, k)?;

            println!("\n=== Results for '{query}' (k={k}) ===\n");
            for (i, result) in results.iter().enumerate() {
                println!("#{} {} (score: {:.4})", i + 1, result.source_id, result.similarity);
                println!("---");
                let preview: String = result.text.chars().take(300).collect();
                let ellipsis = if result.text.chars().count() > 300 { "..." } else { "" };
                println!("{preview}{ellipsis}\n");
            }
        }

        Commands::Ask { question, k } => {
            let k = k.unwrap_or(config.retrieval.k);
            let store = open_store(&config)?;
            ensure_populated(&store, &config.store.path)?;

            let completer = GroqCompleter::new(config.completion.groq()?)?;
            let mut service = RetrievalService::new(load_embedder(&config)?);

            let answer = service
                .answer(&store, &question, k, &completer)
                .await
                .context("failed to answer")?;
            println!("{answer}");
        }

        Commands::Stats => {
            let store = open_store(&config)?;
            println!("Store: {}", store.path().display());
            println!("  Records: {}", store.len());
            match store.dimension() {
                Some(dim) => println!("  Dimensions: {dim}"),
                None => println!("  Dimensions: -"),
            }
            println!("  Model: {}", config.embedding.model.model_name());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pingpoli_lib::store::{EmbeddingRecord, MemoryStore};

    #[test]
    fn test_empty_store_is_an_error() {
        let path = Path::new("data/embeddings.jsonl");
        let mut store = MemoryStore::new();

        let err = ensure_populated(&store, path).unwrap_err();
        assert!(err.to_string().contains("data/embeddings.jsonl"));
        assert!(err.to_string().contains("pingpoli ingest"));

        store
            .insert(EmbeddingRecord::new("a.txt", "hello", vec![1.0]))
            .unwrap();
        assert!(ensure_populated(&store, path).is_ok());
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from(["pingpoli", "ask", "Quem joga hoje?", "-k", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask { ref question, k: Some(3) } if question == "Quem joga hoje?"
        ));
    }
}
