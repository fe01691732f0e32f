//! Ingestion command line tool.
//!
//! Parses documents into chunks, embeds them into the configured index, and offers search,
//! delete and statistics helpers against the same index. Exactly one action runs per call.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use docchat::{config::Config, format, logging, processing::DocumentProcessor};

#[derive(Parser)]
#[command(
    name = "docchat",
    version,
    about = "Ingest documents into a vector index and query it"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["file", "directory", "search", "delete", "stats"])
))]
struct Cli {
    /// Parse and index a single document.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Parse and index every matching document under a directory.
    #[arg(long, value_name = "PATH")]
    directory: Option<PathBuf>,
    /// Run a similarity search and print the best matches.
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,
    /// Remove every vector ingested from the given source path.
    #[arg(long, value_name = "PATH")]
    delete: Option<String>,
    /// Print index statistics.
    #[arg(long)]
    stats: bool,
    /// Index to use instead of `PINECONE_INDEX_NAME`.
    #[arg(long, value_name = "NAME")]
    index: Option<String>,
    /// Number of search hits (defaults to `MAX_CONTEXT_CHUNKS`).
    #[arg(long, value_name = "N", requires = "search")]
    top_k: Option<usize>,
    /// Restrict a search to one source document.
    #[arg(long, value_name = "PATH", requires = "search")]
    source: Option<String>,
    /// Comma-separated extensions for directory scans, e.g. `.pdf,.txt`.
    #[arg(long, value_delimiter = ',', requires = "directory")]
    extensions: Option<Vec<String>>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    let index_name = cli.index.clone().unwrap_or_else(|| config.index_name.clone());
    let processor = DocumentProcessor::from_config(&config, &index_name)
        .await
        .with_context(|| format!("failed to initialize processor for index {index_name}"))?;

    if let Some(path) = &cli.file {
        let report = processor.process_single_file(path).await;
        println!("{}", format::pretty_json(&report));
    } else if let Some(path) = &cli.directory {
        let report = processor
            .process_directory(path, cli.extensions.as_deref())
            .await;
        println!("{}", format::pretty_json(&report));
    } else if let Some(query) = &cli.search {
        let top_k = cli.top_k.unwrap_or(config.max_context_chunks);
        match processor
            .search_documents(query, top_k, cli.source.as_deref())
            .await
            .context("search failed")
        {
            Ok(results) => print!("{}", format::search_results(&results)),
            Err(err) => println!("{}", format::error_result(&err)),
        }
    } else if let Some(source) = &cli.delete {
        let deleted = processor.delete_document(source).await;
        println!("{}", format::delete_outcome(deleted));
    } else if cli.stats {
        match processor
            .get_database_stats()
            .await
            .context("failed to read index statistics")
        {
            Ok(stats) => println!("{}", format::pretty_json(&stats)),
            Err(err) => println!("{}", format::error_result(&err)),
        }
    }

    Ok(())
}
