use alloy::primitives::B256;
use thiserror::Error;

/// A raw log that does not have the shape of the configured two-indexed-address event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedLogError {
    #[error("expected 3 topics (signature, from, to), found {found}")]
    TopicCount { found: usize },
    #[error("topic 0 is {found}, expected event signature {expected}")]
    SignatureMismatch { expected: B256, found: B256 },
    #[error("data payload must be exactly 32 bytes, found {found}")]
    DataLength { found: usize },
    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },
}

/// An operation that needs at least one transfer was run on an empty set.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no transfers in range")]
pub struct EmptySetError;

/// Opaque failure surfaced by the ledger collaborator.
#[derive(Error, Debug)]
#[error("ledger fetch failed: {source}")]
pub struct FetchError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl FetchError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Everything the report pipeline can fail with. Each condition keeps its own variant
/// so callers can tell bad data, no data, and an unreachable node apart.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error(transparent)]
    MalformedLog(#[from] MalformedLogError),
    #[error(transparent)]
    EmptySet(#[from] EmptySetError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
