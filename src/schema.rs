//! SQLite schema initialization.
//!
//! Creates the unified document store (documents, chunks, their FTS5 mirrors
//! and sync triggers) plus the legacy per-source tables (tweets, thoughts)
//! that pre-date the unified layout. The legacy tables are read-only for
//! everything except test fixtures; the migration engine copies them into
//! `documents` without touching them.
//!
//! All statements are idempotent — `lore init` can run any number of times.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    init_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table, index, FTS mirror, and trigger.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Unified documents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            source_type TEXT NOT NULL,
            content_type TEXT,
            title TEXT,
            author TEXT,
            content TEXT,
            source_path TEXT,
            is_chunked INTEGER NOT NULL DEFAULT 0,
            metadata TEXT,
            tags TEXT,
            created_at TEXT,
            indexed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks for oversized documents
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT,
            UNIQUE(document_id, chunk_index),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Legacy tables (pre-unified schema)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tweets (
            tweet_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            full_text TEXT NOT NULL,
            reply_to_tweet_id TEXT,
            reply_to_user TEXT,
            retweet_count INTEGER DEFAULT 0,
            favorite_count INTEGER DEFAULT 0,
            is_retweet INTEGER DEFAULT 0,
            is_reply INTEGER DEFAULT 0,
            entities TEXT,
            indexed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS thoughts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            tags TEXT,
            category TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_fts(pool).await?;
    create_triggers(pool).await?;
    create_indexes(pool).await?;

    Ok(())
}

/// External-content FTS5 mirrors. FTS5 CREATE is not idempotent natively,
/// so each is checked against sqlite_master first.
async fn create_fts(pool: &SqlitePool) -> Result<()> {
    let specs: &[(&str, &str)] = &[
        (
            "documents_fts",
            r#"
            CREATE VIRTUAL TABLE documents_fts USING fts5(
                title,
                author,
                content,
                tags,
                content='documents',
                content_rowid='rowid',
                tokenize='porter unicode61'
            )
            "#,
        ),
        (
            "chunks_fts",
            r#"
            CREATE VIRTUAL TABLE chunks_fts USING fts5(
                content,
                content='chunks',
                content_rowid='rowid',
                tokenize='porter unicode61'
            )
            "#,
        ),
        (
            "tweets_fts",
            r#"
            CREATE VIRTUAL TABLE tweets_fts USING fts5(
                full_text,
                content='tweets',
                content_rowid='rowid',
                tokenize='porter unicode61'
            )
            "#,
        ),
        (
            "thoughts_fts",
            r#"
            CREATE VIRTUAL TABLE thoughts_fts USING fts5(
                content,
                content='thoughts',
                content_rowid='id',
                tokenize='porter unicode61'
            )
            "#,
        ),
    ];

    for (name, ddl) in specs {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;

        if !exists {
            sqlx::query(ddl).execute(pool).await?;
        }
    }

    Ok(())
}

/// Triggers keeping the FTS mirrors in sync with their base tables.
/// External-content FTS deletes go through the special 'delete' insert form.
async fn create_triggers(pool: &SqlitePool) -> Result<()> {
    let statements: &[&str] = &[
        r#"
        CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
            INSERT INTO documents_fts(rowid, title, author, content, tags)
            VALUES (new.rowid, new.title, new.author, new.content, new.tags);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
            INSERT INTO documents_fts(documents_fts, rowid, title, author, content, tags)
            VALUES ('delete', old.rowid, old.title, old.author, old.content, old.tags);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
            INSERT INTO documents_fts(documents_fts, rowid, title, author, content, tags)
            VALUES ('delete', old.rowid, old.title, old.author, old.content, old.tags);
            INSERT INTO documents_fts(rowid, title, author, content, tags)
            VALUES (new.rowid, new.title, new.author, new.content, new.tags);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
            INSERT INTO chunks_fts(rowid, content) VALUES (new.rowid, new.content);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
            INSERT INTO chunks_fts(chunks_fts, rowid, content)
            VALUES ('delete', old.rowid, old.content);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS chunks_au AFTER UPDATE ON chunks BEGIN
            INSERT INTO chunks_fts(chunks_fts, rowid, content)
            VALUES ('delete', old.rowid, old.content);
            INSERT INTO chunks_fts(rowid, content) VALUES (new.rowid, new.content);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS tweets_ai AFTER INSERT ON tweets BEGIN
            INSERT INTO tweets_fts(rowid, full_text) VALUES (new.rowid, new.full_text);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS tweets_ad AFTER DELETE ON tweets BEGIN
            INSERT INTO tweets_fts(tweets_fts, rowid, full_text)
            VALUES ('delete', old.rowid, old.full_text);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS tweets_au AFTER UPDATE ON tweets BEGIN
            INSERT INTO tweets_fts(tweets_fts, rowid, full_text)
            VALUES ('delete', old.rowid, old.full_text);
            INSERT INTO tweets_fts(rowid, full_text) VALUES (new.rowid, new.full_text);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS thoughts_ai AFTER INSERT ON thoughts BEGIN
            INSERT INTO thoughts_fts(rowid, content) VALUES (new.id, new.content);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS thoughts_ad AFTER DELETE ON thoughts BEGIN
            INSERT INTO thoughts_fts(thoughts_fts, rowid, content)
            VALUES ('delete', old.id, old.content);
        END
        "#,
        r#"
        CREATE TRIGGER IF NOT EXISTS thoughts_au AFTER UPDATE ON thoughts BEGIN
            INSERT INTO thoughts_fts(thoughts_fts, rowid, content)
            VALUES ('delete', old.id, old.content);
            INSERT INTO thoughts_fts(rowid, content) VALUES (new.id, new.content);
        END
        "#,
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let statements: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_documents_indexed ON documents(indexed_at)",
        "CREATE INDEX IF NOT EXISTS idx_documents_source_type ON documents(source_type)",
        "CREATE INDEX IF NOT EXISTS idx_documents_content_type ON documents(content_type)",
        "CREATE INDEX IF NOT EXISTS idx_documents_is_chunked ON documents(is_chunked)",
        "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)",
        "CREATE INDEX IF NOT EXISTS idx_tweets_created ON tweets(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_tweets_reply ON tweets(reply_to_tweet_id)",
        "CREATE INDEX IF NOT EXISTS idx_thoughts_created ON thoughts(created_at)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // In-memory databases are per-connection; keep the pool at one.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
