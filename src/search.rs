//! Query operations: full-text search, recency listing, and thread
//! reconstruction.
//!
//! Document search queries both FTS mirrors — `documents_fts` for whole
//! documents and `chunks_fts` for chunked ones — and resolves every hit to
//! its parent document, deduplicated with the best rank winning. Thread
//! reconstruction walks the legacy tweets table, which stays queryable after
//! the non-destructive migration.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::models::SearchHit;

/// Candidates fetched per FTS channel before merging and truncation.
const CANDIDATE_LIMIT: i64 = 80;

/// Full-text search over the unified document store.
pub async fn search_documents(
    pool: &SqlitePool,
    query: &str,
    content_type: Option<&str>,
    source_type: Option<&str>,
    limit: i64,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc_rows = sqlx::query(
        r#"
        SELECT d.id, d.title, d.source_type, d.content_type, d.source_path,
               d.tags, d.created_at, rank,
               snippet(documents_fts, 2, '>>>', '<<<', '...', 40) AS snippet
        FROM documents_fts
        JOIN documents d ON d.rowid = documents_fts.rowid
        WHERE documents_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(query)
    .bind(CANDIDATE_LIMIT)
    .fetch_all(pool)
    .await?;

    let chunk_rows = sqlx::query(
        r#"
        SELECT d.id, d.title, d.source_type, d.content_type, d.source_path,
               d.tags, d.created_at, rank,
               snippet(chunks_fts, 0, '>>>', '<<<', '...', 40) AS snippet
        FROM chunks_fts
        JOIN chunks c ON c.rowid = chunks_fts.rowid
        JOIN documents d ON d.id = c.document_id
        WHERE chunks_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(query)
    .bind(CANDIDATE_LIMIT)
    .fetch_all(pool)
    .await?;

    // Merge both channels by document, best (lowest) rank wins.
    let mut by_doc: HashMap<String, SearchHit> = HashMap::new();
    for row in doc_rows.iter().chain(chunk_rows.iter()) {
        let hit = row_to_hit(row);
        match by_doc.entry(hit.id.clone()) {
            Entry::Occupied(mut entry) => {
                if hit.rank < entry.get().rank {
                    entry.insert(hit);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(hit);
            }
        }
    }

    let mut hits: Vec<SearchHit> = by_doc
        .into_values()
        .filter(|hit| {
            content_type.map_or(true, |ct| hit.content_type.as_deref() == Some(ct))
                && source_type.map_or(true, |st| hit.source_type == st)
        })
        .collect();

    // Rank ascending (FTS5 rank: lower is better), id as tiebreak for
    // deterministic output.
    hits.sort_by(|a, b| {
        a.rank
            .partial_cmp(&b.rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(limit.max(0) as usize);

    info!(query, results = hits.len(), "document search");
    Ok(hits)
}

fn row_to_hit(row: &sqlx::sqlite::SqliteRow) -> SearchHit {
    SearchHit {
        id: row.get("id"),
        title: row.get("title"),
        source_type: row.get("source_type"),
        content_type: row.get("content_type"),
        source_path: row.get("source_path"),
        tags: decode_tags(row.get("tags")),
        created_at: row.get::<Option<String>, _>("created_at").unwrap_or_default(),
        snippet: row.get("snippet"),
        rank: row.get("rank"),
    }
}

/// A recently indexed document, trimmed for listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecentDocument {
    pub id: String,
    pub title: Option<String>,
    pub source_type: String,
    pub content_type: Option<String>,
    pub source_path: Option<String>,
    pub tags: Vec<String>,
    pub preview: String,
    pub indexed_at: String,
}

/// Most recently indexed documents, newest first.
pub async fn list_recent_documents(
    pool: &SqlitePool,
    limit: i64,
    content_type: Option<&str>,
) -> Result<Vec<RecentDocument>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, source_type, content_type, source_path, tags,
               substr(COALESCE(content, ''), 1, 150) AS preview, indexed_at
        FROM documents
        WHERE (?1 IS NULL OR content_type = ?1)
        ORDER BY indexed_at DESC, created_at DESC, id ASC
        LIMIT ?2
        "#,
    )
    .bind(content_type)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RecentDocument {
            id: row.get("id"),
            title: row.get("title"),
            source_type: row.get("source_type"),
            content_type: row.get("content_type"),
            source_path: row.get("source_path"),
            tags: decode_tags(row.get("tags")),
            preview: row.get("preview"),
            indexed_at: row.get("indexed_at"),
        })
        .collect())
}

/// A legacy tweet row, as returned by tweet queries.
#[derive(Debug, Clone, Serialize)]
pub struct Tweet {
    pub tweet_id: String,
    pub user_id: String,
    pub created_at: String,
    pub full_text: String,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub reply_to_tweet_id: Option<String>,
    pub reply_to_user: Option<String>,
    pub retweet_count: i64,
    pub favorite_count: i64,
}

/// Full-text search over the legacy tweets table.
pub async fn search_tweets(
    pool: &SqlitePool,
    query: &str,
    limit: i64,
    include_replies: bool,
    include_retweets: bool,
) -> Result<Vec<Tweet>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        r#"
        SELECT t.tweet_id, t.user_id, t.created_at, t.full_text,
               t.is_reply, t.is_retweet, t.reply_to_tweet_id, t.reply_to_user,
               t.retweet_count, t.favorite_count
        FROM tweets_fts
        JOIN tweets t ON t.rowid = tweets_fts.rowid
        WHERE tweets_fts MATCH ?
        "#,
    );
    if !include_replies {
        sql.push_str(" AND t.is_reply = 0");
    }
    if !include_retweets {
        sql.push_str(" AND t.is_retweet = 0");
    }
    sql.push_str(" ORDER BY t.created_at DESC LIMIT ?");

    let rows = sqlx::query(&sql)
        .bind(query)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(row_to_tweet).collect())
}

/// Reconstruct the complete thread containing a tweet, in chronological
/// order: walk up the reply chain to the root, then collect all transitive
/// replies.
pub async fn find_thread(pool: &SqlitePool, tweet_id: &str) -> Result<Vec<Tweet>> {
    let root_id = find_thread_root(pool, tweet_id).await?;

    let rows = sqlx::query(
        r#"
        WITH RECURSIVE thread AS (
            SELECT * FROM tweets WHERE tweet_id = ?
            UNION ALL
            SELECT t.*
            FROM tweets t
            JOIN thread th ON t.reply_to_tweet_id = th.tweet_id
        )
        SELECT tweet_id, user_id, created_at, full_text,
               is_reply, is_retweet, reply_to_tweet_id, reply_to_user,
               retweet_count, favorite_count
        FROM thread
        ORDER BY created_at ASC
        "#,
    )
    .bind(&root_id)
    .fetch_all(pool)
    .await?;

    info!(tweet_id, thread_len = rows.len(), "thread reconstructed");
    Ok(rows.iter().map(row_to_tweet).collect())
}

/// Walk up the reply chain to the root tweet. Cycle-safe: stops if a tweet
/// id repeats.
async fn find_thread_root(pool: &SqlitePool, tweet_id: &str) -> Result<String> {
    let mut current = tweet_id.to_string();
    let mut visited = HashSet::new();

    while visited.insert(current.clone()) {
        let parent: Option<Option<String>> =
            sqlx::query_scalar("SELECT reply_to_tweet_id FROM tweets WHERE tweet_id = ?")
                .bind(&current)
                .fetch_optional(pool)
                .await?;

        match parent {
            Some(Some(parent_id)) => current = parent_id,
            _ => break,
        }
    }

    Ok(current)
}

fn row_to_tweet(row: &sqlx::sqlite::SqliteRow) -> Tweet {
    Tweet {
        tweet_id: row.get("tweet_id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        full_text: row.get("full_text"),
        is_reply: row.get::<i64, _>("is_reply") != 0,
        is_retweet: row.get::<i64, _>("is_retweet") != 0,
        reply_to_tweet_id: row.get("reply_to_tweet_id"),
        reply_to_user: row.get("reply_to_user"),
        retweet_count: row.get("retweet_count"),
        favorite_count: row.get("favorite_count"),
    }
}

fn decode_tags(raw: Option<String>) -> Vec<String> {
    raw.and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}
