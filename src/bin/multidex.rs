//! CLI binary for multidex.
//!
//! A thin shim over the library crate: maps CLI flags to `IndexingConfig`,
//! wires stores and embedding clients from environment settings, and prints
//! run reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use multidex::flows::{chunks, knowledge, pages};
use multidex::pipeline::embed::{HttpImageEmbedder, HttpTextEmbedder, ImageEmbedder};
use multidex::pipeline::extract::HttpExtractor;
use multidex::server::{self, AppState};
use multidex::store::neo4j::GraphStore;
use multidex::store::postgres::ChunkStore;
use multidex::store::qdrant::PageIndex;
use multidex::{DocOutcome, IndexProgress, IndexingConfig, IndexingReport, Settings};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the run, a println per document.
/// Documents complete out of order under concurrency, which is fine — the
/// bar only counts.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.green/238}] {pos:>4}/{len} docs  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl IndexProgress for CliProgress {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
    }

    fn on_document_done(&self, outcome: &DocOutcome, _total: usize) {
        match &outcome.error {
            None if outcome.records > 0 => self.bar.println(format!(
                "  {} {}  {}",
                green("✓"),
                outcome.filename,
                dim(&format!("{} records", outcome.records)),
            )),
            None => self.bar.println(format!(
                "  {} {}  {}",
                dim("-"),
                outcome.filename,
                dim("skipped"),
            )),
            Some(e) => self.bar.println(format!("  {} {}", red("✗"), red(&e.to_string()))),
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _total: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Index every PDF/image under ./source_files into Qdrant
  multidex index --source source_files

  # Index markdown files into Postgres/pgvector
  multidex index-text --source files --include '*.md'

  # Build a knowledge graph from docs
  multidex index-graph --source docs --include '*.md' --include '*.mdx'

  # Interactive page search (query loop)
  multidex search --limit 5

  # REST search endpoint over the text index
  multidex serve --addr 0.0.0.0:8080

ENVIRONMENT VARIABLES (a .env file next to the binary is honoured):
  MULTIDEX_DATABASE_URL      Postgres connection string (text index, serve)
  MULTIDEX_DOC_TABLE         Chunk table name            [doc_chunks]
  MULTIDEX_QDRANT_URL        Qdrant gRPC endpoint        [http://localhost:6334]
  MULTIDEX_QDRANT_COLLECTION Page collection             [multi_format_pages]
  MULTIDEX_NEO4J_URI         Neo4j bolt URI              [bolt://localhost:7687]
  MULTIDEX_NEO4J_USER        Neo4j user                  [neo4j]
  MULTIDEX_NEO4J_PASSWORD    Neo4j password              (required for index-graph)
  MULTIDEX_EMBEDDING_URL     Embedding server base URL   [http://localhost:8000]
  MULTIDEX_TEXT_MODEL        Text embedding model        [sentence-transformers/all-MiniLM-L6-v2]
  MULTIDEX_IMAGE_MODEL       Page embedding model        [vidore/colpali-v1.2]
  MULTIDEX_LLM_URL           Chat endpoint for extraction [https://api.openai.com/v1]
  MULTIDEX_LLM_MODEL         Extraction model            [gpt-4o]
  MULTIDEX_LLM_API_KEY       API key (falls back to OPENAI_API_KEY)

SETUP:
  PDFium is downloaded automatically on the first `index` run and cached;
  set PDFIUM_DYNAMIC_LIB_PATH to use an existing copy instead.
"#;

/// Index documents into vector and graph stores, and search them.
#[derive(Parser, Debug)]
#[command(
    name = "multidex",
    version,
    about = "Multi-format document indexing and search",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MULTIDEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MULTIDEX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split files into page images, embed them, export to Qdrant.
    Index(IndexArgs),
    /// Chunk text files, embed them, export to Postgres/pgvector.
    IndexText(IndexTextArgs),
    /// Extract summaries and relationships, export to Neo4j.
    IndexGraph(IndexArgs),
    /// Interactive similarity search against the page index.
    Search {
        /// Number of results per query.
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Serve GET /search over the text index.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:8080", env = "MULTIDEX_ADDR")]
        addr: SocketAddr,
    },
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Source directory to index.
    #[arg(short, long, default_value = "source_files")]
    source: PathBuf,

    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Documents processed concurrently.
    #[arg(short, long, default_value_t = 8)]
    concurrency: usize,

    /// Filename pattern to include (repeatable), e.g. --include '*.md'.
    #[arg(long = "include")]
    include: Vec<String>,

    /// Retries per embedding/extraction call.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
}

#[derive(Args, Debug)]
struct IndexTextArgs {
    #[command(flatten)]
    common: IndexArgs,

    /// Target chunk size in bytes.
    #[arg(long, default_value_t = 2000)]
    chunk_size: usize,

    /// Overlap between consecutive chunks, in bytes.
    #[arg(long, default_value_t = 500)]
    chunk_overlap: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let settings = Settings::from_env();

    match cli.command {
        Command::Index(args) => run_index_pages(&settings, args, cli.quiet).await,
        Command::IndexText(args) => run_index_text(&settings, args, cli.quiet).await,
        Command::IndexGraph(args) => run_index_graph(&settings, args, cli.quiet).await,
        Command::Search { limit } => run_search(&settings, limit).await,
        Command::Serve { addr } => run_serve(&settings, addr).await,
    }
}

fn build_config(args: &IndexArgs, quiet: bool) -> Result<IndexingConfig> {
    let mut builder = IndexingConfig::builder()
        .dpi(args.dpi)
        .concurrency(args.concurrency)
        .included_patterns(args.include.clone())
        .max_retries(args.max_retries);
    if !quiet {
        builder = builder.progress(CliProgress::new());
    }
    builder.build().context("invalid configuration")
}

fn print_report(report: &IndexingReport, what: &str, quiet: bool) {
    if quiet {
        return;
    }
    let tick = if report.failed == 0 { green("✔") } else { red("✘") };
    eprintln!(
        "{tick}  {}/{} documents indexed  {} {what}  {}ms",
        bold(&report.indexed.to_string()),
        report.scanned,
        bold(&report.records.to_string()),
        report.duration_ms,
    );
    if report.skipped > 0 {
        eprintln!("   {}", dim(&format!("{} unsupported files skipped", report.skipped)));
    }
    for error in report.errors() {
        eprintln!("   {}", red(&error.to_string()));
    }
}

/// Download pdfium on first use so `index` works out of the box, and point
/// the renderer's library lookup at the cached copy.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if !pdfium_auto::is_pdfium_cached() && !quiet {
        eprintln!("{}", dim("Downloading PDF engine (first run only)…"));
    }
    let path = tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
        .context("failed to locate or download the pdfium library")?;
    if let Some(dir) = path.parent() {
        std::env::set_var("PDFIUM_DYNAMIC_LIB_PATH", dir);
    }
    Ok(())
}

async fn run_index_pages(settings: &Settings, args: IndexArgs, quiet: bool) -> Result<()> {
    ensure_pdfium(quiet)?;
    let config = build_config(&args, quiet)?;
    let embedder =
        HttpImageEmbedder::new(&settings.embedding_url, &settings.image_model, &config)?;
    let index = PageIndex::connect(&settings.qdrant_url, &settings.qdrant_collection)?;

    let report = pages::index_pages(
        &args.source,
        Arc::new(embedder),
        &index,
        settings.image_dim,
        &config,
    )
    .await
    .context("page indexing failed")?;
    print_report(&report, "pages", quiet);
    Ok(())
}

async fn run_index_text(settings: &Settings, args: IndexTextArgs, quiet: bool) -> Result<()> {
    let mut builder = IndexingConfig::builder()
        .concurrency(args.common.concurrency)
        .included_patterns(args.common.include.clone())
        .max_retries(args.common.max_retries)
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap);
    if !quiet {
        builder = builder.progress(CliProgress::new());
    }
    let config = builder.build().context("invalid configuration")?;
    let embedder = HttpTextEmbedder::new(&settings.embedding_url, &settings.text_model, &config)?;
    let store = ChunkStore::connect(settings.database_url()?, &settings.doc_table, 5).await?;

    let report = chunks::index_text(
        &args.common.source,
        Arc::new(embedder),
        &store,
        settings.text_dim,
        &config,
    )
    .await
    .context("text indexing failed")?;
    store.close().await;
    print_report(&report, "chunks", quiet);
    Ok(())
}

async fn run_index_graph(settings: &Settings, args: IndexArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args, quiet)?;
    let extractor = HttpExtractor::new(
        &settings.llm_url,
        &settings.llm_model,
        settings.llm_api_key.as_deref(),
        &config,
    )?;
    let graph = GraphStore::connect(
        &settings.neo4j_uri,
        &settings.neo4j_user,
        settings.neo4j_password()?,
    )
    .await?;

    let report = knowledge::index_knowledge(&args.source, Arc::new(extractor), &graph, &config)
        .await
        .context("knowledge indexing failed")?;
    print_report(&report, "graph writes", quiet);
    Ok(())
}

/// Query loop: embed each line, search the page index, print ranked hits.
/// An empty line (or EOF) quits.
async fn run_search(settings: &Settings, limit: usize) -> Result<()> {
    let config = IndexingConfig::default();
    let embedder =
        HttpImageEmbedder::new(&settings.embedding_url, &settings.image_model, &config)?;
    let index = PageIndex::connect(&settings.qdrant_url, &settings.qdrant_collection)?;

    loop {
        print!("Enter search query (or Enter to quit): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            break;
        }

        let embedding = embedder.embed_query(query).await?;
        let hits = index.query(embedding, limit).await?;

        println!("\nSearch results:");
        for hit in hits {
            let page = hit
                .page
                .map(|p| format!(" Page:{p}"))
                .unwrap_or_default();
            println!("[{:.3}] {}{}", hit.score, hit.filename, page);
            println!("---");
        }
        println!();
    }
    Ok(())
}

async fn run_serve(settings: &Settings, addr: SocketAddr) -> Result<()> {
    let config = IndexingConfig::default();
    let store = ChunkStore::connect(settings.database_url()?, &settings.doc_table, 10).await?;
    let embedder = HttpTextEmbedder::new(&settings.embedding_url, &settings.text_model, &config)?;
    server::serve(
        addr,
        AppState {
            store: Arc::new(store),
            embedder: Arc::new(embedder),
        },
    )
    .await?;
    Ok(())
}
