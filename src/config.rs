use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap_percent")]
    pub overlap_percent: f64,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_percent: default_overlap_percent(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_overlap_percent() -> f64 {
    0.15
}
fn default_min_chunk_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdaptersConfig {
    pub twitter: Option<TwitterAdapterConfig>,
    pub files: Option<FileAdapterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwitterAdapterConfig {
    /// Directory containing the unpacked archive export (tweets.js etc.).
    pub archive_path: PathBuf,
    #[serde(default)]
    pub exclude_retweets: bool,
    /// Only index tweets on or after this date (YYYY-MM-DD).
    #[serde(default)]
    pub min_date: Option<String>,
    /// Only index tweets on or before this date (YYYY-MM-DD).
    #[serde(default)]
    pub max_date: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileAdapterConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if !(0.0..=1.0).contains(&config.chunking.overlap_percent) {
        anyhow::bail!("chunking.overlap_percent must be in [0.0, 1.0]");
    }

    if config.chunking.min_chunk_size > config.chunking.chunk_size {
        anyhow::bail!("chunking.min_chunk_size must not exceed chunking.chunk_size");
    }

    Ok(config)
}
