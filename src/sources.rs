//! Adapter resolution and status listing.
//!
//! Builds adapters from configuration for the `index` command and prints
//! their health for `lore sources`.

use anyhow::Result;

use crate::adapter::Adapter;
use crate::adapter_file::FileAdapter;
use crate::adapter_twitter::TwitterAdapter;
use crate::config::Config;
use crate::error::LoreError;

/// Resolve an adapter selector (`twitter`, `files`, or `all`) into concrete
/// adapters. Selecting a specific adapter that is not configured is an
/// error; `all` silently includes whichever adapters are configured.
pub fn resolve_adapters(config: &Config, selector: &str) -> Result<Vec<Box<dyn Adapter>>> {
    let mut adapters: Vec<Box<dyn Adapter>> = Vec::new();

    match selector {
        "twitter" => {
            let twitter = config
                .adapters
                .twitter
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Twitter adapter not configured"))?;
            adapters.push(Box::new(TwitterAdapter::new(twitter)));
        }
        "files" => {
            let files = config
                .adapters
                .files
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Files adapter not configured"))?;
            adapters.push(Box::new(FileAdapter::new(files)?));
        }
        "all" => {
            if let Some(twitter) = &config.adapters.twitter {
                adapters.push(Box::new(TwitterAdapter::new(twitter)));
            }
            if let Some(files) = &config.adapters.files {
                adapters.push(Box::new(FileAdapter::new(files)?));
            }
            if adapters.is_empty() {
                anyhow::bail!("No adapters configured");
            }
        }
        other => return Err(LoreError::UnknownAdapter(other.to_string()).into()),
    }

    Ok(adapters)
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {:<16} INFO", "ADAPTER", "STATUS");

    match &config.adapters.twitter {
        Some(cfg) => {
            let adapter = TwitterAdapter::new(cfg);
            let status = if adapter.validate_source() {
                "OK"
            } else {
                "INVALID"
            };
            println!("{:<12} {:<16} {}", "twitter", status, adapter.source_info());
        }
        None => println!("{:<12} {:<16}", "twitter", "NOT CONFIGURED"),
    }

    match &config.adapters.files {
        Some(cfg) => match FileAdapter::new(cfg) {
            Ok(adapter) => {
                let status = if adapter.validate_source() {
                    "OK"
                } else {
                    "INVALID"
                };
                println!("{:<12} {:<16} {}", "files", status, adapter.source_info());
            }
            Err(err) => println!("{:<12} {:<16} {}", "files", "ERROR", err),
        },
        None => println!("{:<12} {:<16}", "files", "NOT CONFIGURED"),
    }

    Ok(())
}
