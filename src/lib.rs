//! # Lore
//!
//! A personal knowledge-base indexer with full-text search and MCP-style
//! query tools.
//!
//! Lore ingests exported personal data — a Twitter archive export, local
//! text/markdown files — into a SQLite store with FTS5 full-text search,
//! migrates legacy per-source tables into a unified document schema, and
//! exposes query tools (search, recency listing, thread reconstruction) to
//! AI assistants over an HTTP tool API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Adapters   │──▶│     Indexer      │──▶│  SQLite   │
//! │ Twitter/FS  │   │ Identity + Chunk │   │   FTS5    │
//! └─────────────┘   └──────────────────┘   └────┬─────┘
//!                   ┌──────────────────┐        │
//!                   │ Migration Engine │────────┤
//!                   │ legacy → unified │        │
//!                   └──────────────────┘        │
//!                      ┌────────────────────────┤
//!                      ▼                        ▼
//!                 ┌──────────┐           ┌──────────┐
//!                 │   CLI    │           │   HTTP   │
//!                 │  (lore)  │           │ (tools)  │
//!                 └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lore init                      # create database
//! lore index twitter             # ingest a Twitter archive
//! lore index files               # ingest local notes
//! lore migrate                   # move legacy tables into documents
//! lore search "sourdough"
//! lore serve mcp                 # start the tool server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`identity`] | Content-addressed document ids |
//! | [`chunk`] | Semantic document chunking |
//! | [`adapter`] | Adapter capability contract |
//! | [`adapter_twitter`] | Twitter archive adapter |
//! | [`adapter_file`] | Local file adapter |
//! | [`indexer`] | Ingestion pipeline |
//! | [`migrate`] | Legacy schema migration |
//! | [`search`] | Full-text search and thread queries |
//! | [`tools`] | Query tool trait and registry |
//! | [`server`] | HTTP tool server |
//! | [`schema`] | SQLite schema initialization |
//! | [`db`] | Database connection |

pub mod adapter;
pub mod adapter_file;
pub mod adapter_twitter;
pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod get;
pub mod identity;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod schema;
pub mod search;
pub mod server;
pub mod sources;
pub mod stats;
pub mod tools;
