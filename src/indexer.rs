//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow from adapter records to storage: identity
//! assignment → chunk decision → document upsert → chunk replacement.
//! Per-record failures are counted, never fatal; an invalid source is the
//! one hard precondition failure.

use anyhow::Result;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::adapter::Adapter;
use crate::chunk::Chunker;
use crate::error::LoreError;
use crate::identity::{canonical_timestamp, generate_document_id};
use crate::models::{Chunk, DocumentRecord, IndexReport};

pub struct Indexer<'a> {
    pool: &'a SqlitePool,
    chunker: Chunker,
}

impl<'a> Indexer<'a> {
    pub fn new(pool: &'a SqlitePool, chunker: Chunker) -> Self {
        Self { pool, chunker }
    }

    /// Index every record an adapter produces.
    ///
    /// Returns [`LoreError::InvalidSource`] without touching the store when
    /// the adapter's source fails validation.
    pub async fn index_from_adapter(&self, adapter: &dyn Adapter) -> Result<IndexReport> {
        info!(adapter = adapter.name(), "starting indexing");

        if !adapter.validate_source() {
            return Err(LoreError::InvalidSource(adapter.name().to_string()).into());
        }

        let mut report = IndexReport::default();

        for record in adapter.parse()? {
            match self.index_record(&record).await {
                Ok(chunk_count) => {
                    report.documents += 1;
                    report.chunks += chunk_count;
                }
                Err(err) => {
                    error!(source_path = %record.source_path, %err, "error indexing record");
                    report.errors += 1;
                }
            }

            if report.documents > 0 && report.documents % 1000 == 0 {
                info!(documents = report.documents, "indexed so far");
            }
        }

        info!(
            adapter = adapter.name(),
            documents = report.documents,
            chunks = report.chunks,
            errors = report.errors,
            "indexing complete"
        );
        Ok(report)
    }

    /// Index one record: derive its id, decide on chunking, and write.
    /// Returns the number of chunks written.
    async fn index_record(&self, record: &DocumentRecord) -> Result<u64> {
        let created_at = canonical_timestamp(record.created_at);
        let doc_id = generate_document_id(&record.content, &record.source_path, &created_at);

        let chunks = self
            .chunker
            .chunk_document(&doc_id, &record.content, &record.metadata);
        let is_chunked = !chunks.is_empty();

        // A chunked document stores its text in the chunks only.
        let stored_content = if is_chunked {
            None
        } else {
            Some(record.content.as_str())
        };

        upsert_document(
            self.pool,
            &doc_id,
            record,
            stored_content,
            is_chunked,
            &created_at,
        )
        .await?;
        replace_chunks(self.pool, &doc_id, &chunks).await?;

        Ok(chunks.len() as u64)
    }
}

async fn upsert_document(
    pool: &SqlitePool,
    doc_id: &str,
    record: &DocumentRecord,
    content: Option<&str>,
    is_chunked: bool,
    created_at: &str,
) -> Result<()> {
    let metadata = encode_map(&record.metadata);
    let tags = encode_tags(&record.tags);
    let indexed_at = canonical_timestamp(chrono::Utc::now());

    sqlx::query(
        r#"
        INSERT INTO documents (id, source_type, content_type, title, author, content, source_path, is_chunked, metadata, tags, created_at, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            source_type = excluded.source_type,
            content_type = excluded.content_type,
            title = excluded.title,
            author = excluded.author,
            content = excluded.content,
            source_path = excluded.source_path,
            is_chunked = excluded.is_chunked,
            metadata = excluded.metadata,
            tags = excluded.tags,
            created_at = excluded.created_at,
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(doc_id)
    .bind(&record.source_type)
    .bind(&record.content_type)
    .bind(&record.title)
    .bind(&record.author)
    .bind(content)
    .bind(&record.source_path)
    .bind(is_chunked as i64)
    .bind(metadata)
    .bind(tags)
    .bind(created_at)
    .bind(indexed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace a document's chunks: delete the old set and insert the new one
/// inside a single transaction, so a re-index never leaves stale chunks.
async fn replace_chunks(pool: &SqlitePool, document_id: &str, chunks: &[Chunk]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, content, metadata) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(encode_map(&chunk.metadata))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub(crate) fn encode_map(map: &Map<String, Value>) -> Option<String> {
    if map.is_empty() {
        None
    } else {
        serde_json::to_string(map).ok()
    }
}

pub(crate) fn encode_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        serde_json::to_string(tags).ok()
    }
}
