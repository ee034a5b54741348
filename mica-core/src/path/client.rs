//! Capability seam for the search index.
//!
//! The core never talks to a concrete index; both wire flavors (native
//! transport and REST) implement this one trait. Implementations map an
//! index-side 400 to [`MicaError::IndexQueryMalformed`] carrying the
//! serialized query, and network failures to
//! [`MicaError::BackendUnavailable`].

use super::PathDocument;
use serde::Serialize;
use std::collections::HashSet;

/// Scroll context lifetime requested for paged searches.
pub const SCROLL_TTL: &str = "1m";

/// Mapping for the path index: exact-token tenant and path, numeric depth,
/// `_all` disabled, source stored uncompressed. Clients create the index
/// with this body when it is missing.
pub const PATHS_INDEX_MAPPING: &str = r#"{
  "path": {
    "_all": {"enabled": false},
    "_source": {"compress": false},
    "properties": {
      "tenant": {"index": "not_analyzed", "type": "string"},
      "path": {"index": "not_analyzed", "type": "string"},
      "depth": {"type": "long"},
      "leaf": {"type": "boolean"}
    }
  }
}"#;

/// The query envelope handed to [`IndexClient::search`]. Every clause is a
/// must-match: tenant term, depth equality, path regex, and optionally
/// `leaf = true`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub tenant: String,
    pub depth: i64,
    pub path_regex: String,
    pub leafs_only: bool,
    pub scroll: String,
}

impl SearchQuery {
    /// Serialized form for error payloads and logging.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Total hits across all pages, as reported by the index.
    pub total: usize,
    pub hits: Vec<PathDocument>,
    /// Present when more pages can be pulled via [`IndexClient::scroll`].
    pub scroll_id: Option<String>,
}

pub trait IndexClient: Send + Sync {
    /// Which of `ids` exist in the index.
    fn multi_get(&self, ids: &[String]) -> crate::Result<HashSet<String>>;

    /// Upsert a batch of path documents in one bulk request.
    fn bulk_upsert(&self, docs: &[PathDocument]) -> crate::Result<()>;

    /// Single-document upsert.
    fn put(&self, doc: &PathDocument) -> crate::Result<()>;

    /// Single-id existence check.
    fn exists(&self, id: &str) -> crate::Result<bool>;

    /// Execute a query, returning the first page and a scroll handle.
    fn search(&self, query: &SearchQuery) -> crate::Result<SearchPage>;

    /// Pull the next page of a scrolling search.
    fn scroll(&self, scroll_id: &str) -> crate::Result<SearchPage>;
}
