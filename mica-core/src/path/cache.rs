//! Process-local cache of shallow prefix documents known to exist in the
//! search index.
//!
//! Shallow prefixes are pathologically hot (millions of metrics share
//! them); without this set every sample would cost an index existence
//! check. The set only ever grows, bounded in practice by the population
//! of prefixes at `depth <= STORE_TO_DEPTH`.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Only prefixes at or above this depth are cached.
pub const STORE_TO_DEPTH: i64 = 2;

/// Shared set of document ids (`"<tenant>_<path>"`). Written only by the
/// filter stage of the path pipeline after a successful existence check;
/// readers racing a write at worst re-check a prefix that just landed.
#[derive(Debug, Default)]
pub struct SubPathCache {
    inner: RwLock<HashSet<String>>,
}

impl SubPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    /// Batch union, one write lock per pipeline batch.
    pub fn extend(&self, ids: impl IntoIterator<Item = String>) {
        self.inner.write().extend(ids);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
