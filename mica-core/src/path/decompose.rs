//! Dotted-path decomposition: every ancestor prefix of a metric name,
//! tagged with depth and leaf flag.

use super::cache::{SubPathCache, STORE_TO_DEPTH};
use super::{document_id, PathDocument};

/// Number of dot-separated segments; depth of the full path (1-based).
pub fn segments(path: &str) -> i64 {
    path.matches('.').count() as i64 + 1
}

/// Expand `(tenant, path)` into its prefix documents, left-to-right by
/// separator index. Non-terminal prefixes are non-leaf; the terminal
/// document is always a leaf and is never omitted.
///
/// Shallow prefixes (`depth <= STORE_TO_DEPTH`) already known to the
/// sub-path cache are skipped.
pub fn decompose(tenant: &str, path: &str, cache: &SubPathCache) -> Vec<PathDocument> {
    let mut docs = Vec::with_capacity(segments(path) as usize);

    for (nth, (idx, _)) in path.match_indices('.').enumerate() {
        let prefix = &path[..idx];
        if prefix.is_empty() {
            continue;
        }
        let depth = nth as i64 + 1;
        if depth <= STORE_TO_DEPTH && cache.contains(&document_id(tenant, prefix)) {
            continue;
        }
        docs.push(PathDocument {
            tenant: tenant.to_string(),
            path: prefix.to_string(),
            depth,
            leaf: false,
        });
    }

    docs.push(PathDocument {
        tenant: tenant.to_string(),
        path: path.to_string(),
        depth: segments(path),
        leaf: true,
    });

    docs
}
