//! Document retrieval by ID.
//!
//! Fetches a full document and its associated chunks from the database.
//! For chunked documents the body is reassembled from the ordered chunks.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::error::LoreError;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub source_type: String,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub source_path: Option<String>,
    pub is_chunked: bool,
    pub metadata: Value,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub indexed_at: String,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub index: i64,
    pub content: String,
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<DocumentResponse> {
    let row = sqlx::query(
        "SELECT id, source_type, content_type, title, author, content, source_path, is_chunked, metadata, tags, created_at, indexed_at FROM documents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| LoreError::DocumentNotFound(id.to_string()))?;

    let chunk_rows = sqlx::query(
        "SELECT chunk_index, content FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let chunks: Vec<ChunkResponse> = chunk_rows
        .iter()
        .map(|row| ChunkResponse {
            index: row.get("chunk_index"),
            content: row.get("content"),
        })
        .collect();

    let metadata: Value = row
        .get::<Option<String>, _>("metadata")
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    let tags: Vec<String> = row
        .get::<Option<String>, _>("tags")
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    Ok(DocumentResponse {
        id: row.get("id"),
        source_type: row.get("source_type"),
        content_type: row.get("content_type"),
        title: row.get("title"),
        author: row.get("author"),
        content: row.get("content"),
        source_path: row.get("source_path"),
        is_chunked: row.get::<i64, _>("is_chunked") != 0,
        metadata,
        tags,
        created_at: row.get("created_at"),
        indexed_at: row.get("indexed_at"),
        chunks,
    })
}
