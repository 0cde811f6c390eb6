//! Adapter contract for data sources.
//!
//! Any type that can validate its source, describe it, and lazily produce
//! document records qualifies as an adapter; the indexer is polymorphic over
//! this capability set and does not know which concrete adapter produced a
//! record.

use anyhow::Result;
use serde_json::Value;

use crate::models::DocumentRecord;

/// A lazy, finite, one-shot sequence of records. Restarting requires calling
/// [`Adapter::parse`] again.
pub type RecordIter<'a> = Box<dyn Iterator<Item = DocumentRecord> + 'a>;

/// A data source that produces document records for ingestion.
///
/// Source-level failures (missing files, undecodable bytes) are absorbed at
/// the adapter boundary: `parse` logs and yields nothing rather than
/// propagating. A false `validate_source` is the one hard precondition the
/// indexer refuses to proceed past.
pub trait Adapter: std::fmt::Debug {
    /// Short adapter name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the source is accessible and in the expected format.
    fn validate_source(&self) -> bool;

    /// Metadata about the source (paths, file sizes, counts).
    fn source_info(&self) -> Value;

    /// Produce all records from the source.
    fn parse(&self) -> Result<RecordIter<'_>>;
}
