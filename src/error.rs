//! Typed errors for the boundaries where callers branch on the failure kind.
//!
//! Most of the crate propagates `anyhow::Result`; these variants exist for
//! the hard precondition failures that must stay distinguishable from
//! per-record noise (which is absorbed into run counters instead).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoreError {
    /// `validate_source()` returned false: the operation must not proceed.
    #[error("invalid data source for adapter '{0}'")]
    InvalidSource(String),

    /// Lookup by id found nothing.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The CLI was asked for an adapter that is not configured or known.
    #[error("unknown adapter: '{0}'. Available: twitter, files, all")]
    UnknownAdapter(String),
}
