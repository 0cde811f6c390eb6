//! Legacy schema migration.
//!
//! Copies rows from the pre-unified `tweets` and `thoughts` tables into the
//! unified `documents` table. Identity re-derivation makes the migration
//! idempotent: a record whose derived id already exists in `documents` is
//! skipped, never overwritten. The legacy tables are never mutated.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use tracing::{error, info};

use crate::identity::{canonical_timestamp, generate_document_id};
use crate::indexer::{encode_map, encode_tags};
use crate::models::{MigrationReport, MigrationStats};

pub struct MigrationEngine<'a> {
    pool: &'a SqlitePool,
}

enum Outcome {
    Migrated,
    Skipped,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Migrate all legacy tweets into the unified documents table.
    pub async fn migrate_tweets_to_documents(&self, dry_run: bool) -> Result<MigrationStats> {
        let rows = sqlx::query(
            r#"
            SELECT
                tweet_id, user_id, created_at, full_text,
                reply_to_tweet_id, reply_to_user,
                retweet_count, favorite_count,
                is_retweet, is_reply, entities
            FROM tweets
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let mut stats = MigrationStats {
            total: rows.len() as u64,
            ..Default::default()
        };
        info!(total = stats.total, "found tweets to migrate");

        for row in &rows {
            let tweet_id: String = row.get("tweet_id");
            match self.migrate_tweet_row(row, dry_run).await {
                Ok(Outcome::Migrated) => stats.migrated += 1,
                Ok(Outcome::Skipped) => stats.skipped += 1,
                Err(err) => {
                    error!(tweet_id, %err, "error migrating tweet");
                    stats.errors += 1;
                }
            }

            if stats.migrated > 0 && stats.migrated % 1000 == 0 {
                info!(migrated = stats.migrated, total = stats.total, "migrating tweets");
            }
        }

        info!(?stats, "tweet migration complete");
        Ok(stats)
    }

    async fn migrate_tweet_row(&self, row: &sqlx::sqlite::SqliteRow, dry_run: bool) -> Result<Outcome> {
        let tweet_id: String = row.get("tweet_id");
        let user_id: String = row.get("user_id");
        let created_at: String = row.get("created_at");
        let full_text: String = row.get("full_text");
        let reply_to_tweet_id: Option<String> = row.get("reply_to_tweet_id");
        let reply_to_user: Option<String> = row.get("reply_to_user");
        let retweet_count: i64 = row.get("retweet_count");
        let favorite_count: i64 = row.get("favorite_count");
        let is_retweet: bool = row.get::<i64, _>("is_retweet") != 0;
        let is_reply: bool = row.get::<i64, _>("is_reply") != 0;
        let entities_json: Option<String> = row.get("entities");

        let entities: Option<Value> = match entities_json {
            Some(raw) => Some(serde_json::from_str(&raw).context("malformed entities JSON")?),
            None => None,
        };

        let source_path = format!("twitter://{}/{}", user_id, tweet_id);
        // Hash the stored timestamp string verbatim so re-runs re-derive the
        // same id.
        let doc_id = generate_document_id(&full_text, &source_path, &created_at);

        if self.already_migrated(&doc_id).await? {
            return Ok(Outcome::Skipped);
        }

        let tags: Vec<String> = entities
            .as_ref()
            .and_then(|e| e.get("hashtags"))
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut metadata = Map::new();
        metadata.insert("tweet_id".to_string(), Value::from(tweet_id.clone()));
        metadata.insert("username".to_string(), Value::from(user_id.clone()));
        metadata.insert("retweet_count".to_string(), Value::from(retweet_count));
        metadata.insert("favorite_count".to_string(), Value::from(favorite_count));
        metadata.insert("is_retweet".to_string(), Value::from(is_retweet));
        metadata.insert("is_reply".to_string(), Value::from(is_reply));
        if let Some(id) = &reply_to_tweet_id {
            metadata.insert("reply_to_tweet_id".to_string(), Value::from(id.clone()));
        }
        if let Some(user) = &reply_to_user {
            metadata.insert("reply_to_user".to_string(), Value::from(user.clone()));
        }
        if let Some(entities) = entities {
            metadata.insert("entities".to_string(), entities);
        }

        // The retweet flag wins over reply flags.
        let content_type = if is_retweet {
            "retweet"
        } else if is_reply {
            "reply"
        } else {
            "tweet"
        };

        let created_at_parsed = parse_legacy_timestamp(&created_at)?;

        if !dry_run {
            insert_document(
                self.pool,
                &doc_id,
                "twitter",
                Some(content_type),
                None,
                Some(&user_id),
                &full_text,
                &source_path,
                &metadata,
                &tags,
                created_at_parsed,
            )
            .await?;
        }

        Ok(Outcome::Migrated)
    }

    /// Migrate all legacy thoughts into the unified documents table.
    pub async fn migrate_thoughts_to_documents(&self, dry_run: bool) -> Result<MigrationStats> {
        let rows = sqlx::query(
            "SELECT id, content, tags, category, created_at, updated_at FROM thoughts",
        )
        .fetch_all(self.pool)
        .await?;

        let mut stats = MigrationStats {
            total: rows.len() as u64,
            ..Default::default()
        };
        info!(total = stats.total, "found thoughts to migrate");

        for row in &rows {
            let thought_id: i64 = row.get("id");
            match self.migrate_thought_row(row, dry_run).await {
                Ok(Outcome::Migrated) => stats.migrated += 1,
                Ok(Outcome::Skipped) => stats.skipped += 1,
                Err(err) => {
                    error!(thought_id, %err, "error migrating thought");
                    stats.errors += 1;
                }
            }
        }

        info!(?stats, "thought migration complete");
        Ok(stats)
    }

    async fn migrate_thought_row(&self, row: &sqlx::sqlite::SqliteRow, dry_run: bool) -> Result<Outcome> {
        let thought_id: i64 = row.get("id");
        let content: String = row.get("content");
        let tags_json: Option<String> = row.get("tags");
        let category: Option<String> = row.get("category");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        let tags: Vec<String> = match tags_json {
            Some(raw) => serde_json::from_str(&raw).context("malformed tags JSON")?,
            None => Vec::new(),
        };

        let source_path = format!("thought://{}", thought_id);
        let doc_id = generate_document_id(&content, &source_path, &created_at);

        if self.already_migrated(&doc_id).await? {
            return Ok(Outcome::Skipped);
        }

        let mut metadata = Map::new();
        metadata.insert("thought_id".to_string(), Value::from(thought_id));
        metadata.insert(
            "category".to_string(),
            category.map(Value::from).unwrap_or(Value::Null),
        );
        metadata.insert("updated_at".to_string(), Value::from(updated_at));

        let created_at_parsed = parse_legacy_timestamp(&created_at)?;

        if !dry_run {
            insert_document(
                self.pool,
                &doc_id,
                "user",
                Some("note"),
                None,
                None,
                &content,
                &source_path,
                &metadata,
                &tags,
                created_at_parsed,
            )
            .await?;
        }

        Ok(Outcome::Migrated)
    }

    /// Run tweet migration then thought migration and aggregate the totals.
    pub async fn run_full_migration(&self, dry_run: bool) -> Result<MigrationReport> {
        info!(dry_run, "starting full migration");

        let tweets = self.migrate_tweets_to_documents(dry_run).await?;
        let thoughts = self.migrate_thoughts_to_documents(dry_run).await?;

        let report = MigrationReport {
            total_migrated: tweets.migrated + thoughts.migrated,
            total_errors: tweets.errors + thoughts.errors,
            tweets,
            thoughts,
            dry_run,
        };

        info!(
            total_migrated = report.total_migrated,
            total_errors = report.total_errors,
            "full migration complete"
        );
        Ok(report)
    }

    async fn already_migrated(&self, doc_id: &str) -> Result<bool> {
        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM documents WHERE id = ?")
            .bind(doc_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(existing.is_some())
    }
}

/// Legacy timestamps are ISO 8601 strings, sometimes with an offset or a
/// trailing `Z`, sometimes naive (assumed UTC).
fn parse_legacy_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    anyhow::bail!("malformed timestamp: {raw}")
}

#[allow(clippy::too_many_arguments)]
async fn insert_document(
    pool: &SqlitePool,
    doc_id: &str,
    source_type: &str,
    content_type: Option<&str>,
    title: Option<&str>,
    author: Option<&str>,
    content: &str,
    source_path: &str,
    metadata: &Map<String, Value>,
    tags: &[String],
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, source_type, content_type, title, author, content, source_path, is_chunked, metadata, tags, created_at, indexed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(doc_id)
    .bind(source_type)
    .bind(content_type)
    .bind(title)
    .bind(author)
    .bind(content)
    .bind(source_path)
    .bind(encode_map(metadata))
    .bind(encode_tags(tags))
    .bind(canonical_timestamp(created_at))
    .bind(canonical_timestamp(Utc::now()))
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_pool;

    async fn seed_tweet(
        pool: &SqlitePool,
        tweet_id: &str,
        user_id: &str,
        created_at: &str,
        full_text: &str,
        is_retweet: bool,
        is_reply: bool,
        entities: Option<&str>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO tweets (tweet_id, user_id, created_at, full_text, reply_to_tweet_id, reply_to_user, retweet_count, favorite_count, is_retweet, is_reply, entities)
            VALUES (?, ?, ?, ?, NULL, NULL, 2, 5, ?, ?, ?)
            "#,
        )
        .bind(tweet_id)
        .bind(user_id)
        .bind(created_at)
        .bind(full_text)
        .bind(is_retweet as i64)
        .bind(is_reply as i64)
        .bind(entities)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_thought(pool: &SqlitePool, content: &str, tags: Option<&str>, category: Option<&str>) {
        sqlx::query(
            "INSERT INTO thoughts (content, tags, category, created_at, updated_at) VALUES (?, ?, ?, '2021-03-01T10:00:00', '2021-03-02T10:00:00')",
        )
        .bind(content)
        .bind(tags)
        .bind(category)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_tweet_migration_builds_document() {
        let pool = test_pool().await;
        seed_tweet(
            &pool,
            "1",
            "alice",
            "2020-01-01T00:00:00",
            "hello",
            false,
            false,
            Some(r#"{"hashtags": ["intro"]}"#),
        )
        .await;

        let engine = MigrationEngine::new(&pool);
        let stats = engine.migrate_tweets_to_documents(false).await.unwrap();
        assert_eq!(
            stats,
            MigrationStats {
                total: 1,
                migrated: 1,
                skipped: 0,
                errors: 0
            }
        );

        let row = sqlx::query(
            "SELECT source_type, content_type, author, content, source_path, metadata, tags FROM documents",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.get::<String, _>("source_type"), "twitter");
        assert_eq!(row.get::<String, _>("content_type"), "tweet");
        assert_eq!(row.get::<String, _>("author"), "alice");
        assert_eq!(row.get::<String, _>("content"), "hello");
        assert_eq!(row.get::<String, _>("source_path"), "twitter://alice/1");

        let metadata: Value =
            serde_json::from_str(&row.get::<String, _>("metadata")).unwrap();
        assert_eq!(metadata["tweet_id"], Value::from("1"));
        assert_eq!(metadata["username"], Value::from("alice"));
        assert_eq!(metadata["retweet_count"], Value::from(2));
        assert_eq!(metadata["favorite_count"], Value::from(5));

        let tags: Vec<String> = serde_json::from_str(&row.get::<String, _>("tags")).unwrap();
        assert_eq!(tags, vec!["intro".to_string()]);
    }

    #[tokio::test]
    async fn test_migration_idempotent() {
        let pool = test_pool().await;
        seed_tweet(&pool, "1", "alice", "2020-01-01T00:00:00", "hello", false, false, None).await;
        seed_thought(&pool, "a passing idea", Some(r#"["idea"]"#), Some("idea")).await;

        let engine = MigrationEngine::new(&pool);
        let first = engine.run_full_migration(false).await.unwrap();
        assert_eq!(first.total_migrated, 2);
        assert_eq!(first.total_errors, 0);

        let second = engine.run_full_migration(false).await.unwrap();
        assert_eq!(second.total_migrated, 0);
        assert_eq!(second.tweets.skipped, second.tweets.total);
        assert_eq!(second.thoughts.skipped, second.thoughts.total);

        let docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(docs, 2);
    }

    #[tokio::test]
    async fn test_retweet_wins_over_reply_flags() {
        let pool = test_pool().await;
        seed_tweet(
            &pool,
            "2",
            "alice",
            "2020-02-01T00:00:00",
            "RT @bob: something",
            true,
            true,
            None,
        )
        .await;
        seed_tweet(
            &pool,
            "3",
            "alice",
            "2020-02-02T00:00:00",
            "@bob sure",
            false,
            true,
            None,
        )
        .await;

        let engine = MigrationEngine::new(&pool);
        engine.migrate_tweets_to_documents(false).await.unwrap();

        let retweet_type: String = sqlx::query_scalar(
            "SELECT content_type FROM documents WHERE source_path = 'twitter://alice/2'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(retweet_type, "retweet");

        let reply_type: String = sqlx::query_scalar(
            "SELECT content_type FROM documents WHERE source_path = 'twitter://alice/3'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(reply_type, "reply");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let pool = test_pool().await;
        seed_tweet(&pool, "1", "alice", "2020-01-01T00:00:00", "hello", false, false, None).await;

        let engine = MigrationEngine::new(&pool);
        let report = engine.run_full_migration(true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.tweets.migrated, 1);

        let docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(docs, 0);
    }

    #[tokio::test]
    async fn test_bad_record_counted_not_fatal() {
        let pool = test_pool().await;
        seed_tweet(&pool, "1", "alice", "not-a-timestamp", "broken", false, false, None).await;
        seed_tweet(&pool, "2", "alice", "2020-01-01T00:00:00", "fine", false, false, None).await;
        seed_tweet(
            &pool,
            "3",
            "alice",
            "2020-01-02T00:00:00",
            "bad entities",
            false,
            false,
            Some("{not json"),
        )
        .await;

        let engine = MigrationEngine::new(&pool);
        let stats = engine.migrate_tweets_to_documents(false).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.migrated, 1);
        assert_eq!(stats.errors, 2);
    }

    #[tokio::test]
    async fn test_thought_migration_metadata() {
        let pool = test_pool().await;
        seed_thought(&pool, "remember this", Some(r#"["memory","later"]"#), Some("idea")).await;

        let engine = MigrationEngine::new(&pool);
        let stats = engine.migrate_thoughts_to_documents(false).await.unwrap();
        assert_eq!(stats.migrated, 1);

        let row = sqlx::query(
            "SELECT source_type, content_type, metadata, tags, source_path FROM documents",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.get::<String, _>("source_type"), "user");
        assert_eq!(row.get::<String, _>("content_type"), "note");
        assert_eq!(row.get::<String, _>("source_path"), "thought://1");

        let metadata: Value = serde_json::from_str(&row.get::<String, _>("metadata")).unwrap();
        assert_eq!(metadata["thought_id"], Value::from(1));
        assert_eq!(metadata["category"], Value::from("idea"));
        assert_eq!(metadata["updated_at"], Value::from("2021-03-02T10:00:00"));

        let tags: Vec<String> = serde_json::from_str(&row.get::<String, _>("tags")).unwrap();
        assert_eq!(tags, vec!["memory".to_string(), "later".to_string()]);
    }

    #[tokio::test]
    async fn test_legacy_tables_untouched() {
        let pool = test_pool().await;
        seed_tweet(&pool, "1", "alice", "2020-01-01T00:00:00", "hello", false, false, None).await;
        seed_thought(&pool, "a thought", None, None).await;

        let engine = MigrationEngine::new(&pool);
        engine.run_full_migration(false).await.unwrap();

        let tweets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
            .fetch_one(&pool)
            .await
            .unwrap();
        let thoughts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM thoughts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tweets, 1);
        assert_eq!(thoughts, 1);

        let text: String = sqlx::query_scalar("SELECT full_text FROM tweets WHERE tweet_id = '1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }
}
