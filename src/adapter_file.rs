//! Local file adapter.
//!
//! Walks a configured root directory for files matching the include globs
//! and yields one document record per file. Markdown files get lightweight
//! frontmatter parsing for title, tags, and extra metadata, with a
//! first-heading fallback for the title.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::adapter::{Adapter, RecordIter};
use crate::config::FileAdapterConfig;
use crate::models::DocumentRecord;

#[derive(Debug)]
pub struct FileAdapter {
    root: PathBuf,
    include_set: GlobSet,
    exclude_set: GlobSet,
    follow_symlinks: bool,
}

impl FileAdapter {
    pub fn new(config: &FileAdapterConfig) -> Result<Self> {
        let include_set = build_globset(&config.include_globs)?;

        let mut excludes = vec![
            "**/.git/**".to_string(),
            "**/target/**".to_string(),
            "**/node_modules/**".to_string(),
        ];
        excludes.extend(config.exclude_globs.clone());
        let exclude_set = build_globset(&excludes)?;

        Ok(Self {
            root: config.root.clone(),
            include_set,
            exclude_set,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// Matching files under the root, sorted for deterministic ordering.
    fn matching_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root).follow_links(self.follow_symlinks);
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy();
            if self.exclude_set.is_match(rel_str.as_ref()) {
                continue;
            }
            if !self.include_set.is_match(rel_str.as_ref()) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        files
    }

    fn file_to_record(&self, path: &Path) -> Option<DocumentRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable file");
                return None;
            }
        };

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => "markdown",
            _ => "text",
        };

        let (title, mut metadata, tags) = if content_type == "markdown" {
            parse_markdown(&content)
        } else {
            (None, Map::new(), Vec::new())
        };

        let title = title.or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
        });

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        metadata.insert("file_name".to_string(), Value::from(file_name));
        metadata.insert("file_size".to_string(), Value::from(file_size));
        metadata.insert(
            "file_path".to_string(),
            Value::from(path.display().to_string()),
        );

        Some(DocumentRecord {
            source_type: "file".to_string(),
            content_type: Some(content_type.to_string()),
            title,
            author: None,
            content,
            source_path: path.display().to_string(),
            created_at: file_mtime(path),
            metadata,
            tags,
        })
    }
}

impl Adapter for FileAdapter {
    fn name(&self) -> &str {
        "files"
    }

    fn validate_source(&self) -> bool {
        self.root.is_dir()
    }

    fn source_info(&self) -> Value {
        json!({
            "type": "files",
            "root": self.root.display().to_string(),
            "matched_files": self.matching_files().len(),
        })
    }

    fn parse(&self) -> Result<RecordIter<'_>> {
        let files = self.matching_files();
        let iter = files
            .into_iter()
            .filter_map(move |path| self.file_to_record(&path));
        Ok(Box::new(iter))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn file_mtime(path: &Path) -> DateTime<Utc> {
    let modified_secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Utc.timestamp_opt(modified_secs, 0).unwrap()
}

/// Extract (title, metadata, tags) from markdown frontmatter.
///
/// Handles the common `key: value` cases, not full YAML. Tags accept both
/// `[a, b]` and comma-separated forms. Falls back to the first `# ` heading
/// for the title.
fn parse_markdown(content: &str) -> (Option<String>, Map<String, Value>, Vec<String>) {
    let mut title = None;
    let mut metadata = Map::new();
    let mut tags = Vec::new();

    if let Some(frontmatter) = frontmatter_block(content) {
        for line in frontmatter.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "title" => title = Some(value.trim_matches(&['"', '\''][..]).to_string()),
                "tags" => {
                    let items = value.strip_prefix('[').and_then(|v| v.strip_suffix(']'));
                    let list = items.unwrap_or(value);
                    tags = list
                        .split(',')
                        .map(|t| t.trim().trim_matches(&['"', '\''][..]).to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                _ => {
                    metadata.insert(key.to_string(), Value::from(value));
                }
            }
        }
    }

    if title.is_none() {
        title = content.lines().find_map(|line| {
            line.strip_prefix("# ")
                .map(|heading| heading.trim().to_string())
        });
    }

    (title, metadata, tags)
}

fn frontmatter_block(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}
