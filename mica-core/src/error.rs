//! Error types for mica operations

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MicaError {
    /// The search index rejected a query (HTTP 400 class). Carries the
    /// serialized query so callers can see exactly what was sent.
    #[error("malformed index query: {reason}")]
    IndexQueryMalformed { reason: String, query: String },

    #[error("glob matched {requested} paths, over the configured threshold of {threshold}")]
    TooManyPaths { requested: usize, threshold: usize },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("fetch deadline of {0:?} exceeded")]
    FetchTimeout(Duration),

    #[error("batch write failed: {0}")]
    BatchWriteFailed(String),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
