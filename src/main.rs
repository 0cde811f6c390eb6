//! # Lore CLI (`lore`)
//!
//! The `lore` binary is the primary interface for the knowledge base. It
//! provides commands for database initialization, data ingestion, legacy
//! migration, search, document retrieval, and starting the tool server.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./config/lore.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore init` | Create the SQLite database and schema |
//! | `lore sources` | List configured adapters and their health |
//! | `lore index <adapter>` | Ingest from an adapter (twitter, files, all) |
//! | `lore migrate` | Migrate legacy tables into the unified schema |
//! | `lore search "<query>"` | Full-text search over indexed documents |
//! | `lore recent` | List recently indexed documents |
//! | `lore thread <tweet_id>` | Reconstruct a tweet thread |
//! | `lore get <id>` | Retrieve a full document by id |
//! | `lore stats` | Database statistics |
//! | `lore serve mcp` | Start the HTTP tool server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lore::chunk::{Chunker, ChunkerConfig};
use lore::config::{self, Config};
use lore::db;
use lore::get::get_document;
use lore::indexer::Indexer;
use lore::migrate::MigrationEngine;
use lore::schema;
use lore::search::{find_thread, list_recent_documents, search_documents};
use lore::server;
use lore::sources;
use lore::stats::collect_stats;

/// Lore — a personal knowledge-base indexer with full-text search and
/// MCP-style query tools.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Lore — a personal knowledge-base indexer with full-text search and query tools",
    version,
    long_about = "Lore ingests exported personal data (Twitter archives, local text/markdown \
    files) into a SQLite store with FTS5 full-text search, migrates legacy per-source tables \
    into a unified document schema, and exposes query tools to AI assistants over HTTP."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (documents,
    /// chunks, legacy tables, FTS mirrors, triggers). Idempotent.
    Init,

    /// List configured adapters and their health status.
    Sources,

    /// Ingest data from an adapter into the unified document store.
    ///
    /// Oversized documents are split into overlapping chunks; re-running is
    /// idempotent because document ids are content-derived.
    Index {
        /// Adapter selector: `twitter`, `files`, or `all`.
        adapter: String,
    },

    /// Migrate legacy tweets and thoughts tables into the documents table.
    ///
    /// Non-destructive and idempotent: legacy rows are never modified, and
    /// already-migrated records are skipped on re-runs.
    Migrate {
        /// Perform every step except the writes; report what would happen.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search indexed documents.
    Search {
        /// The search query string (FTS5 syntax).
        query: String,

        /// Filter by content type (e.g. `markdown`, `tweet`, `note`).
        #[arg(long)]
        content_type: Option<String>,

        /// Filter by source type (e.g. `twitter`, `file`, `user`).
        #[arg(long)]
        source_type: Option<String>,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// List recently indexed documents.
    Recent {
        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: i64,

        /// Filter by content type.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Reconstruct the complete thread containing a tweet.
    Thread {
        /// Any tweet id from the thread.
        tweet_id: String,
    },

    /// Retrieve a document by its id.
    Get {
        /// Document id.
        id: String,
    },

    /// Database statistics.
    Stats,

    /// Start the HTTP tool server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP-compatible tool server on the configured bind address.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            schema::run_init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Index { adapter } => {
            run_index(&cfg, &adapter).await?;
        }
        Commands::Migrate { dry_run } => {
            run_migrate(&cfg, dry_run).await?;
        }
        Commands::Search {
            query,
            content_type,
            source_type,
            limit,
        } => {
            run_search(&cfg, &query, content_type.as_deref(), source_type.as_deref(), limit)
                .await?;
        }
        Commands::Recent {
            limit,
            content_type,
        } => {
            run_recent(&cfg, limit, content_type.as_deref()).await?;
        }
        Commands::Thread { tweet_id } => {
            run_thread(&cfg, &tweet_id).await?;
        }
        Commands::Get { id } => {
            run_get(&cfg, &id).await?;
        }
        Commands::Stats => {
            run_stats(&cfg).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}

fn chunker_from(cfg: &Config) -> Chunker {
    Chunker::new(ChunkerConfig {
        chunk_size: cfg.chunking.chunk_size,
        overlap_percent: cfg.chunking.overlap_percent,
        min_chunk_size: cfg.chunking.min_chunk_size,
    })
}

async fn run_index(cfg: &Config, selector: &str) -> anyhow::Result<()> {
    let adapters = sources::resolve_adapters(cfg, selector)?;
    let pool = db::connect(cfg).await?;
    schema::init_schema(&pool).await?;

    let indexer = Indexer::new(&pool, chunker_from(cfg));
    for adapter in &adapters {
        let report = indexer.index_from_adapter(adapter.as_ref()).await?;
        println!("index {}", adapter.name());
        println!("  documents indexed: {}", report.documents);
        println!("  chunks written: {}", report.chunks);
        println!("  errors: {}", report.errors);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn run_migrate(cfg: &Config, dry_run: bool) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    schema::init_schema(&pool).await?;

    let engine = MigrationEngine::new(&pool);
    let report = engine.run_full_migration(dry_run).await?;

    if dry_run {
        println!("migrate (dry-run)");
    } else {
        println!("migrate");
    }
    for (label, stats) in [("tweets", &report.tweets), ("thoughts", &report.thoughts)] {
        println!(
            "  {:<9} total {}, migrated {}, skipped {}, errors {}",
            label, stats.total, stats.migrated, stats.skipped, stats.errors
        );
    }
    println!("  total migrated: {}", report.total_migrated);
    println!("  total errors: {}", report.total_errors);
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn run_search(
    cfg: &Config,
    query: &str,
    content_type: Option<&str>,
    source_type: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let hits = search_documents(&pool, query, content_type, source_type, limit).await?;

    if hits.is_empty() {
        println!("No results.");
        pool.close().await;
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = hit
            .title
            .as_deref()
            .or(hit.source_path.as_deref())
            .unwrap_or("(untitled)");
        println!("{}. {}", i + 1, title);
        println!(
            "    type: {} | source: {}",
            hit.content_type.as_deref().unwrap_or("unknown"),
            hit.source_type
        );
        if !hit.tags.is_empty() {
            println!("    tags: {}", hit.tags.join(", "));
        }
        println!("    excerpt: \"{}\"", hit.snippet.replace('\n', " "));
        println!("    id: {}", hit.id);
        println!();
    }

    pool.close().await;
    Ok(())
}

async fn run_recent(cfg: &Config, limit: i64, content_type: Option<&str>) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let docs = list_recent_documents(&pool, limit, content_type).await?;

    if docs.is_empty() {
        println!("No documents.");
        pool.close().await;
        return Ok(());
    }

    for doc in &docs {
        let title = doc
            .title
            .as_deref()
            .or(doc.source_path.as_deref())
            .unwrap_or("(untitled)");
        println!("[{}] {}", &doc.indexed_at[..doc.indexed_at.len().min(10)], title);
        println!(
            "    type: {} | source: {}",
            doc.content_type.as_deref().unwrap_or("unknown"),
            doc.source_type
        );
        println!("    id: {}", doc.id);
        println!();
    }

    pool.close().await;
    Ok(())
}

async fn run_thread(cfg: &Config, tweet_id: &str) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let thread = find_thread(&pool, tweet_id).await?;

    if thread.is_empty() {
        println!("No thread found for tweet {}", tweet_id);
        pool.close().await;
        return Ok(());
    }

    println!("Thread with {} tweets:", thread.len());
    println!();
    for (i, tweet) in thread.iter().enumerate() {
        println!("{}. [{}] @{}", i + 1, tweet.created_at, tweet.user_id);
        println!("   {}", tweet.full_text);
        println!("   id: {}", tweet.tweet_id);
        println!();
    }

    pool.close().await;
    Ok(())
}

async fn run_get(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let doc = get_document(&pool, id).await?;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!(
        "title:        {}",
        doc.title.as_deref().unwrap_or("(untitled)")
    );
    println!("source_type:  {}", doc.source_type);
    println!(
        "content_type: {}",
        doc.content_type.as_deref().unwrap_or("unknown")
    );
    if let Some(ref author) = doc.author {
        println!("author:       {}", author);
    }
    if let Some(ref path) = doc.source_path {
        println!("source_path:  {}", path);
    }
    if let Some(ref created) = doc.created_at {
        println!("created_at:   {}", created);
    }
    println!("indexed_at:   {}", doc.indexed_at);
    if !doc.tags.is_empty() {
        println!("tags:         {}", doc.tags.join(", "));
    }
    println!("metadata:     {}", doc.metadata);
    println!();

    if let Some(ref content) = doc.content {
        println!("--- Body ---");
        println!("{}", content);
        println!();
    }

    if !doc.chunks.is_empty() {
        println!("--- Chunks ({}) ---", doc.chunks.len());
        for chunk in &doc.chunks {
            println!("[chunk {}]", chunk.index);
            println!("{}", chunk.content);
            println!();
        }
    }

    pool.close().await;
    Ok(())
}

async fn run_stats(cfg: &Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let stats = collect_stats(&pool).await?;

    let db_size = std::fs::metadata(&cfg.db.path).map(|m| m.len()).unwrap_or(0);

    println!("Lore — Database Stats");
    println!("=====================");
    println!();
    println!("  Database:   {}", cfg.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Documents:  {}", stats.total_documents);
    println!("    complete: {}", stats.complete_documents);
    println!("    chunked:  {}", stats.chunked_documents);
    println!("  Chunks:     {}", stats.total_chunks);
    println!();
    println!("  Legacy tweets:   {}", stats.legacy_tweets);
    println!("  Legacy thoughts: {}", stats.legacy_thoughts);

    if !stats.by_source_type.is_empty() {
        println!();
        println!("  By source type:");
        for (source, count) in &stats.by_source_type {
            println!("    {:<16} {}", source, count);
        }
    }
    if !stats.by_content_type.is_empty() {
        println!();
        println!("  By content type:");
        for (content_type, count) in &stats.by_content_type {
            println!("    {:<16} {}", content_type, count);
        }
    }

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
