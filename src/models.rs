//! Core data models used throughout Lore.
//!
//! These types represent the documents, chunks, and migration results that
//! flow through the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Record produced by an adapter before identity assignment and storage.
///
/// Every adapter normalizes its source format into this shape; the indexer
/// does not know which concrete adapter produced a record.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub source_type: String,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: String,
    pub source_path: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
    pub tags: Vec<String>,
}

/// A fragment of a document too large to store as one full-text unit.
///
/// Chunks for a document form a total order by `chunk_index` starting at 0
/// with no gaps.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub metadata: Map<String, Value>,
}

/// Per-table migration outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub total: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Combined result of a full legacy migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub tweets: MigrationStats,
    pub thoughts: MigrationStats,
    pub total_migrated: u64,
    pub total_errors: u64,
    pub dry_run: bool,
}

/// Counts returned by an indexing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexReport {
    pub documents: u64,
    pub chunks: u64,
    pub errors: u64,
}

/// A ranked full-text search hit, resolved to its parent document.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: Option<String>,
    pub source_type: String,
    pub content_type: Option<String>,
    pub source_path: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub snippet: String,
    pub rank: f64,
}
