//! Database statistics overview.
//!
//! Provides a quick summary of what's indexed: document and chunk counts,
//! chunked vs complete documents, per-source and per-content-type
//! breakdowns, and legacy table sizes. Used by `lore stats` to give
//! confidence that indexing and migration are working as expected.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Serialize, Default)]
pub struct StoreStats {
    pub total_documents: i64,
    pub complete_documents: i64,
    pub chunked_documents: i64,
    pub total_chunks: i64,
    pub legacy_tweets: i64,
    pub legacy_thoughts: i64,
    pub by_source_type: Vec<(String, i64)>,
    pub by_content_type: Vec<(String, i64)>,
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<StoreStats> {
    let total_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    let complete_documents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_chunked = 0")
            .fetch_one(pool)
            .await?;
    let chunked_documents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_chunked = 1")
            .fetch_one(pool)
            .await?;
    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    let legacy_tweets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
        .fetch_one(pool)
        .await?;
    let legacy_thoughts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM thoughts")
        .fetch_one(pool)
        .await?;

    let by_source_type = group_counts(pool, "source_type").await?;
    let by_content_type = group_counts(pool, "content_type").await?;

    Ok(StoreStats {
        total_documents,
        complete_documents,
        chunked_documents,
        total_chunks,
        legacy_tweets,
        legacy_thoughts,
        by_source_type,
        by_content_type,
    })
}

async fn group_counts(pool: &SqlitePool, column: &str) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT COALESCE({col}, 'unknown') AS k, COUNT(*) AS n FROM documents GROUP BY {col} ORDER BY n DESC, k ASC",
        col = column
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("k"), row.get::<i64, _>("n")))
        .collect())
}
