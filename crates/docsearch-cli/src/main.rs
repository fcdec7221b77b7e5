//! docsearch CLI - Command-line interface
//!
//! Usage:
//!   docsearch init
//!   docsearch index <files>...
//!   docsearch query <text> [-k N] [--json]
//!   docsearch export-pages <pdf> [-o FILE]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docsearch_core::{AppConfig, DocSearchError, LoggingConfig, SearchResult};
use docsearch_extract::{render_page_dump, ExtractorRegistry, PdfExtractor};
use docsearch_pipeline::{IndexOutcome, IndexingPipeline, QueryPipeline};
use docsearch_vector::{check_embedder, create_embedder, Embedder, QdrantIndex, VectorIndex};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Semantic search over PDF and audio documents")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector collection if it does not exist
    Init,
    /// Extract, embed and store documents from files
    Index {
        /// PDF or audio files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Search the indexed documents
    Query {
        /// Question to search for
        text: String,
        /// Number of results (defaults to query.top_k)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the text of every PDF page to a file or stdout
    ExportPages {
        /// PDF file
        pdf: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Embedder and Qdrant index shared by both pipelines
///
/// Fails before any work when the embedding model does not fit the
/// configured collection, and creates the collection if it is missing.
async fn connect(config: &AppConfig) -> anyhow::Result<(Arc<dyn Embedder>, Arc<dyn VectorIndex>)> {
    let embedder: Arc<dyn Embedder> =
        Arc::from(create_embedder(&config.embedding, config.vector.vector_dimension)?);
    let index: Arc<dyn VectorIndex> = Arc::new(QdrantIndex::new(&config.vector)?);

    check_embedder(embedder.as_ref(), index.collection())?;
    index.ensure_collection().await?;
    Ok((embedder, index))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config).context("failed to load configuration")?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Init => {
            let (_, index) = connect(&config).await?;
            println!(
                "Collection '{}' ready ({} dimensions, {})",
                index.collection().name,
                index.collection().vector_size,
                index.collection().distance
            );
        }
        Commands::Index { files } => {
            let (embedder, index) = connect(&config).await?;

            let registry = ExtractorRegistry::from_config(&config.speech)?;
            let supported = registry.extensions().join(", ");
            let pipeline = IndexingPipeline::new(registry, embedder, index)
                .with_id_policy(config.vector.id_policy);

            let mut failed = 0usize;
            for file in &files {
                match pipeline.index_file(file).await {
                    Ok(IndexOutcome::Indexed(count)) => {
                        println!("{}: indexed {count} documents", file.display());
                    }
                    Ok(IndexOutcome::NoContent) => {
                        println!("{}: no content extracted", file.display());
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(path = %file.display(), error = %e, "Indexing failed");
                        match e {
                            DocSearchError::UnsupportedFormat(_) => {
                                eprintln!("{}: {e} (supported: {supported})", file.display());
                            }
                            _ => eprintln!("{}: {e}", file.display()),
                        }
                    }
                }
            }

            if failed > 0 {
                anyhow::bail!("{failed} of {} files failed to index", files.len());
            }
        }
        Commands::Query { text, top_k, json } => {
            let (embedder, index) = connect(&config).await?;
            let top_k = top_k.unwrap_or(config.query.top_k);
            let results = QueryPipeline::new(embedder, index).query(&text, top_k).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Commands::ExportPages { pdf, output } => {
            let pages = PdfExtractor::new().read_pages(&pdf).await?;
            let dump = render_page_dump(&pages);

            match output {
                Some(path) => {
                    tokio::fs::write(&path, dump)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {} pages to {}", pages.len(), path.display());
                }
                None => print!("{dump}"),
            }
        }
    }

    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results");
        return;
    }

    for (rank, result) in results.iter().enumerate() {
        let source = result.source().unwrap_or("?");
        match result.page_number {
            Some(page) => println!("{}. [{:.4}] {source} p.{page}", rank + 1, result.score),
            None => println!("{}. [{:.4}] {source}", rank + 1, result.score),
        }
        println!("   {}", result.content.trim());
    }
}
