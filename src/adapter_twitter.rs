//! Twitter archive adapter.
//!
//! Parses the `tweets.js` file from an unpacked Twitter data export and
//! yields one document record per tweet. The export wraps JSON in a
//! JavaScript assignment (`window.YTD.tweets.part0 = [...]`) which is
//! stripped before parsing. The account username comes from `account.js`.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::adapter::{Adapter, RecordIter};
use crate::config::TwitterAdapterConfig;
use crate::models::DocumentRecord;

#[derive(Debug)]
pub struct TwitterAdapter {
    archive_path: PathBuf,
    username: String,
    exclude_retweets: bool,
    min_date: Option<DateTime<Utc>>,
    max_date: Option<DateTime<Utc>>,
}

impl TwitterAdapter {
    pub fn new(config: &TwitterAdapterConfig) -> Self {
        let username = extract_username(&config.archive_path);
        Self {
            archive_path: config.archive_path.clone(),
            username,
            exclude_retweets: config.exclude_retweets,
            min_date: parse_date_filter(config.min_date.as_deref(), false),
            max_date: parse_date_filter(config.max_date.as_deref(), true),
        }
    }

    fn tweet_to_record(&self, tweet: &Value) -> Option<DocumentRecord> {
        let created_at = parse_twitter_date(tweet.get("created_at").and_then(Value::as_str))?;

        if let Some(min) = self.min_date {
            if created_at < min {
                return None;
            }
        }
        if let Some(max) = self.max_date {
            if created_at > max {
                return None;
            }
        }

        let tweet_id = tweet.get("id_str").and_then(Value::as_str)?.to_string();
        let full_text = tweet
            .get("full_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let is_retweet = full_text.starts_with("RT @");
        if self.exclude_retweets && is_retweet {
            return None;
        }

        let reply_to_tweet_id = tweet
            .get("in_reply_to_status_id_str")
            .and_then(Value::as_str)
            .map(str::to_string);
        let reply_to_user = tweet
            .get("in_reply_to_screen_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let is_reply = reply_to_tweet_id.is_some();

        let entities = tweet.get("entities").map(extract_entities);
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

        let content_type = if is_retweet {
            "retweet"
        } else if is_reply {
            "reply"
        } else {
            "tweet"
        };

        let mut metadata = Map::new();
        metadata.insert("tweet_id".to_string(), Value::from(tweet_id.clone()));
        metadata.insert("username".to_string(), Value::from(self.username.clone()));
        metadata.insert(
            "retweet_count".to_string(),
            Value::from(count_field(tweet, "retweet_count")),
        );
        metadata.insert(
            "favorite_count".to_string(),
            Value::from(count_field(tweet, "favorite_count")),
        );
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

        Some(DocumentRecord {
            source_type: "twitter".to_string(),
            content_type: Some(content_type.to_string()),
            title: None,
            author: Some(self.username.clone()),
            content: full_text,
            source_path: format!("twitter://{}/{}", self.username, tweet_id),
            created_at,
            metadata,
            tags,
        })
    }
}

impl Adapter for TwitterAdapter {
    fn name(&self) -> &str {
        "twitter"
    }

    fn validate_source(&self) -> bool {
        if !self.archive_path.exists() {
            warn!(path = %self.archive_path.display(), "archive path does not exist");
            return false;
        }
        if !self.archive_path.join("tweets.js").exists() {
            warn!(path = %self.archive_path.display(), "tweets.js not found in archive");
            return false;
        }
        true
    }

    fn source_info(&self) -> Value {
        let mut files = Map::new();
        for name in ["tweets.js", "account.js"] {
            let path = self.archive_path.join(name);
            let entry = match std::fs::metadata(&path) {
                Ok(meta) => json!({ "exists": true, "size_bytes": meta.len() }),
                Err(_) => json!({ "exists": false }),
            };
            files.insert(name.to_string(), entry);
        }

        json!({
            "type": "twitter_archive",
            "path": self.archive_path.display().to_string(),
            "username": self.username,
            "files": files,
        })
    }

    fn parse(&self) -> Result<RecordIter<'_>> {
        let tweets_file = self.archive_path.join("tweets.js");
        let items = match load_js_file(&tweets_file) {
            Some(items) => items,
            None => return Ok(Box::new(std::iter::empty())),
        };
        info!(count = items.len(), "parsing tweets from archive");

        let iter = items.into_iter().filter_map(move |item| {
            let tweet = item.get("tweet")?;
            self.tweet_to_record(tweet)
        });

        Ok(Box::new(iter))
    }
}

/// Load a Twitter export `.js` file and parse its JSON payload.
///
/// Exports look like `window.YTD.tweets.part0 = [...]`; plain JSON files are
/// accepted too.
fn load_js_file(path: &Path) -> Option<Vec<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read archive file");
            return None;
        }
    };

    let json_str = if content.trim_start().starts_with("window.YTD.") {
        match content.find('[') {
            Some(start) => &content[start..],
            None => {
                warn!(path = %path.display(), "no JSON array in archive file");
                return None;
            }
        }
    } else {
        content.as_str()
    };

    match serde_json::from_str::<Vec<Value>>(json_str.trim()) {
        Ok(items) => Some(items),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to parse archive file");
            None
        }
    }
}

/// Twitter's date format: `Thu Nov 06 04:18:45 +0000 2025`.
fn parse_twitter_date(date_str: Option<&str>) -> Option<DateTime<Utc>> {
    let date_str = date_str?;
    match DateTime::parse_from_str(date_str, "%a %b %d %H:%M:%S %z %Y") {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(err) => {
            warn!(date = date_str, %err, "failed to parse tweet date");
            None
        }
    }
}

/// Config date filters are plain `YYYY-MM-DD`; max filters cover the whole day.
fn parse_date_filter(date_str: Option<&str>, end_of_day: bool) -> Option<DateTime<Utc>> {
    let date_str = date_str?;
    let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => {
            warn!(date = date_str, %err, "invalid date filter");
            return None;
        }
    };
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    Some(time.unwrap().and_utc())
}

/// Simplify the raw entities blob to hashtags, mentions, and urls.
fn extract_entities(entities: &Value) -> Value {
    let hashtags: Vec<Value> = entities
        .get("hashtags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("text").cloned())
                .collect()
        })
        .unwrap_or_default();

    let mentions: Vec<Value> = entities
        .get("user_mentions")
        .and_then(Value::as_array)
        .map(|mentions| {
            mentions
                .iter()
                .map(|m| {
                    json!({
                        "screen_name": m.get("screen_name").cloned().unwrap_or(Value::Null),
                        "name": m.get("name").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let urls: Vec<Value> = entities
        .get("urls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .map(|u| {
                    json!({
                        "url": u.get("url").cloned().unwrap_or(Value::Null),
                        "expanded_url": u.get("expanded_url").cloned().unwrap_or(Value::Null),
                        "display_url": u.get("display_url").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({ "hashtags": hashtags, "mentions": mentions, "urls": urls })
}

/// Counts arrive as strings in archive exports; accept numbers too.
fn count_field(tweet: &Value, key: &str) -> i64 {
    match tweet.get(key) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

/// Username from `account.js`, falling back to "unknown".
fn extract_username(archive_path: &Path) -> String {
    let account_file = archive_path.join("account.js");
    if !account_file.exists() {
        warn!("account.js not found, username will be 'unknown'");
        return "unknown".to_string();
    }

    if let Some(items) = load_js_file(&account_file) {
        if let Some(account) = items.first().and_then(|item| item.get("account")) {
            let username = account
                .get("username")
                .or_else(|| account.get("accountDisplayName"))
                .and_then(Value::as_str);
            if let Some(username) = username {
                info!(username, "extracted username from account.js");
                return username.to_string();
            }
        }
    }

    "unknown".to_string()
}
