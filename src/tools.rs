//! Query tools for AI assistants.
//!
//! Each tool pairs a JSON-schema parameter description with an executor that
//! returns a human-readable text block. Tools are registered in a
//! [`ToolRegistry`] and dispatched by name — the HTTP server exposes them at
//! `POST /tools/{name}`, and any type implementing [`Tool`] can be
//! registered alongside the built-ins.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::search::{find_thread, list_recent_documents, search_documents, search_tweets};

/// Bridge giving tools access to the knowledge base during execution.
///
/// Owns the storage session used for every query a tool makes; created once
/// at server startup and shared across invocations.
pub struct ToolContext {
    pool: SqlitePool,
}

impl ToolContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A named query tool that agents can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier used as the route path (`POST /tools/{name}`).
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with a JSON object of arguments; returns a text block.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String>;
}

/// Registry for tools (built-in and custom).
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the built-in query tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchDocumentsTool));
        registry.register(Box::new(ListRecentDocumentsTool));
        registry.register(Box::new(SearchTweetsTool));
        registry.register(Box::new(FindThreadTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Built-in tools ============

/// Full-text search over the unified document store.
pub struct SearchDocumentsTool;

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search all documents in the knowledge base (notes, files, tweets). Returns matching documents with snippets."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query (full-text search)" },
                "content_type": { "type": "string", "description": "Filter by content type (e.g. 'markdown', 'tweet', 'note')" },
                "source_type": { "type": "string", "description": "Filter by source type (e.g. 'twitter', 'file', 'user')" },
                "limit": { "type": "integer", "description": "Maximum number of results", "default": 10 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let query = params["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            anyhow::bail!("query must not be empty");
        }
        let content_type = params["content_type"].as_str();
        let source_type = params["source_type"].as_str();
        let limit = params["limit"].as_i64().unwrap_or(10);

        let hits = search_documents(ctx.pool(), query, content_type, source_type, limit).await?;
        if hits.is_empty() {
            return Ok(format!("No documents found matching '{}'", query));
        }

        let mut out = format!("Found {} documents matching '{}':\n\n", hits.len(), query);
        for hit in &hits {
            let title = hit
                .title
                .as_deref()
                .or(hit.source_path.as_deref())
                .unwrap_or("Untitled");
            out.push_str(&format!("{}\n", title));
            out.push_str(&format!(
                "   Type: {} | Date: {}\n",
                hit.content_type.as_deref().unwrap_or("unknown"),
                date_part(&hit.created_at)
            ));
            if !hit.tags.is_empty() {
                out.push_str(&format!("   Tags: {}\n", hit.tags.join(", ")));
            }
            out.push_str(&format!("   {}\n", hit.snippet.replace('\n', " ")));
            out.push_str(&format!("   ID: {}\n\n", hit.id));
        }
        Ok(out)
    }
}

/// Recency listing over the unified document store.
pub struct ListRecentDocumentsTool;

#[async_trait]
impl Tool for ListRecentDocumentsTool {
    fn name(&self) -> &str {
        "list_recent_documents"
    }

    fn description(&self) -> &str {
        "List recently indexed documents in the knowledge base."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "description": "Maximum number of results", "default": 10 },
                "content_type": { "type": "string", "description": "Filter by content type" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let limit = params["limit"].as_i64().unwrap_or(10);
        let content_type = params["content_type"].as_str();

        let docs = list_recent_documents(ctx.pool(), limit, content_type).await?;
        if docs.is_empty() {
            let filter = content_type
                .map(|ct| format!(" of type '{}'", ct))
                .unwrap_or_default();
            return Ok(format!("No documents found{}", filter));
        }

        let mut out = format!("Recent documents ({}):\n\n", docs.len());
        for doc in &docs {
            let title = doc
                .title
                .as_deref()
                .or(doc.source_path.as_deref())
                .unwrap_or("Untitled");
            out.push_str(&format!("{}\n", title));
            out.push_str(&format!(
                "   Type: {} | Added: {}\n",
                doc.content_type.as_deref().unwrap_or("unknown"),
                date_part(&doc.indexed_at)
            ));
            if !doc.tags.is_empty() {
                out.push_str(&format!("   Tags: {}\n", doc.tags.join(", ")));
            }
            if !doc.preview.is_empty() {
                out.push_str(&format!("   {}...\n", doc.preview.replace('\n', " ")));
            }
            out.push_str(&format!("   ID: {}\n\n", doc.id));
        }
        Ok(out)
    }
}

/// Full-text search over the legacy tweets table.
pub struct SearchTweetsTool;

#[async_trait]
impl Tool for SearchTweetsTool {
    fn name(&self) -> &str {
        "search_tweets"
    }

    fn description(&self) -> &str {
        "Search archived tweets using full-text search. Returns matching tweets with metadata."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" },
                "limit": { "type": "integer", "description": "Maximum number of results", "default": 20 },
                "include_replies": { "type": "boolean", "description": "Include reply tweets", "default": true },
                "include_retweets": { "type": "boolean", "description": "Include retweets", "default": false }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let query = params["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            anyhow::bail!("query must not be empty");
        }
        let limit = params["limit"].as_i64().unwrap_or(20);
        let include_replies = params["include_replies"].as_bool().unwrap_or(true);
        let include_retweets = params["include_retweets"].as_bool().unwrap_or(false);

        let tweets =
            search_tweets(ctx.pool(), query, limit, include_replies, include_retweets).await?;
        if tweets.is_empty() {
            return Ok(format!("No tweets found matching '{}'", query));
        }

        let mut out = format!("Found {} tweets matching '{}':\n\n", tweets.len(), query);
        for tweet in &tweets {
            out.push_str(&format!(
                "[{}] @{}\n{}\n",
                date_part(&tweet.created_at),
                tweet.user_id,
                tweet.full_text
            ));
            out.push_str(&format!(
                "   {} retweets, {} likes | ID: {}\n\n",
                tweet.retweet_count, tweet.favorite_count, tweet.tweet_id
            ));
        }
        Ok(out)
    }
}

/// Thread reconstruction from any member tweet.
pub struct FindThreadTool;

#[async_trait]
impl Tool for FindThreadTool {
    fn name(&self) -> &str {
        "find_thread"
    }

    fn description(&self) -> &str {
        "Find a complete tweet thread given any tweet ID in the thread. Returns all tweets in chronological order."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tweet_id": { "type": "string", "description": "Any tweet ID from the thread" }
            },
            "required": ["tweet_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let tweet_id = params["tweet_id"].as_str().unwrap_or("");
        if tweet_id.trim().is_empty() {
            anyhow::bail!("tweet_id must not be empty");
        }

        let thread = find_thread(ctx.pool(), tweet_id).await?;
        if thread.is_empty() {
            return Ok(format!("No thread found for tweet {}", tweet_id));
        }

        let mut out = format!("Thread with {} tweets:\n\n", thread.len());
        for (i, tweet) in thread.iter().enumerate() {
            out.push_str(&format!(
                "{}. [{}] {}\n   ID: {}\n\n",
                i + 1,
                date_part(&tweet.created_at),
                tweet.full_text,
                tweet.tweet_id
            ));
        }
        Ok(out)
    }
}

/// Leading `YYYY-MM-DD` of a stored timestamp string.
fn date_part(ts: &str) -> &str {
    ts.get(..10).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_pool;

    #[tokio::test]
    async fn test_builtins_registered_and_found() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 4);
        assert!(registry.find("search_documents").is_some());
        assert!(registry.find("find_thread").is_some());
        assert!(registry.find("nope").is_none());
    }

    #[tokio::test]
    async fn test_search_documents_tool_text() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO documents (id, source_type, content_type, title, content, tags, created_at) VALUES ('d1', 'file', 'markdown', 'Sourdough Notes', 'all about sourdough', '[\"baking\"]', '2021-05-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let ctx = ToolContext::new(pool);
        let tool = SearchDocumentsTool;
        let out = tool
            .execute(json!({ "query": "sourdough" }), &ctx)
            .await
            .unwrap();
        assert!(out.contains("Sourdough Notes"));
        assert!(out.contains("Tags: baking"));
        assert!(out.contains("ID: d1"));
        assert!(out.contains("Date: 2021-05-01"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let pool = test_pool().await;
        let ctx = ToolContext::new(pool);
        let err = SearchDocumentsTool
            .execute(json!({ "query": "  " }), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn test_find_thread_tool_order() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO tweets (tweet_id, user_id, created_at, full_text) VALUES ('1', 'alice', '2020-01-01T00:00:00', 'root tweet')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO tweets (tweet_id, user_id, created_at, full_text, reply_to_tweet_id, is_reply) VALUES ('2', 'alice', '2020-01-01T00:01:00', 'follow-up', '1', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let ctx = ToolContext::new(pool);
        let out = FindThreadTool
            .execute(json!({ "tweet_id": "2" }), &ctx)
            .await
            .unwrap();
        assert!(out.contains("Thread with 2 tweets"));
        let root_pos = out.find("root tweet").unwrap();
        let follow_pos = out.find("follow-up").unwrap();
        assert!(root_pos < follow_pos);
    }
}
