//! Path index: the searchable catalog of dotted metric names.
//!
//! Every incoming metric name is decomposed into its ancestor prefixes and
//! indexed as documents, so Graphite-style globs can be answered with one
//! depth-filtered regex query instead of a tree walk.

pub mod cache;
pub mod client;
pub mod decompose;
pub mod glob;
mod pipeline;

use crate::config::PathStoreConfig;
use crate::counters::Counters;
use crate::MicaError;
use cache::SubPathCache;
use client::{IndexClient, SearchPage, SearchQuery, SCROLL_TTL};
use crossbeam_channel::Sender;
use decompose::{decompose, segments};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;

pub use pipeline::PathInput;

/// One node of the metric-name tree as stored in the search index.
///
/// `(tenant, path)` identifies at most one document; `depth` is the
/// 1-based segment count and `leaf` marks full metric names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDocument {
    pub tenant: String,
    pub path: String,
    pub depth: i64,
    pub leaf: bool,
}

impl PathDocument {
    pub fn id(&self) -> String {
        document_id(&self.tenant, &self.path)
    }
}

/// Index document id for a `(tenant, path)` pair.
pub fn document_id(tenant: &str, path: &str) -> String {
    format!("{tenant}_{path}")
}

/// The path store: streaming index writer plus glob query surface.
///
/// Writers push `(path, tenant)` pairs into [`PathStore::channel`]; the
/// pipeline expands, deduplicates, existence-checks and bulk-writes them
/// without blocking the sample path. [`PathStore::register`] is the
/// synchronous single-path variant for non-streaming callers.
pub struct PathStore {
    config: PathStoreConfig,
    client: Arc<dyn IndexClient>,
    cache: Arc<SubPathCache>,
    counters: Arc<Counters>,
    ingress: Sender<PathInput>,
    handles: Vec<JoinHandle<()>>,
}

impl PathStore {
    pub fn new(
        config: PathStoreConfig,
        client: Arc<dyn IndexClient>,
        counters: Arc<Counters>,
    ) -> Self {
        let cache = Arc::new(SubPathCache::new());
        let pipeline = pipeline::spawn(
            &config,
            Arc::clone(&client),
            Arc::clone(&cache),
            Arc::clone(&counters),
        );
        Self {
            config,
            client,
            cache,
            counters,
            ingress: pipeline.ingress,
            handles: pipeline.handles,
        }
    }

    /// Streaming ingress. Sends block while the pipeline is saturated.
    pub fn channel(&self) -> Sender<PathInput> {
        self.ingress.clone()
    }

    /// Synchronously index one path: expand, check each document, write
    /// the missing ones. Does not touch the sub-path cache.
    pub fn register(&self, tenant: &str, path: &str) -> crate::Result<()> {
        for doc in decompose(tenant, path, &self.cache) {
            if !self.client.exists(&doc.id())? {
                self.client.put(&doc)?;
                self.counters.add_index_create(1);
            }
        }
        Ok(())
    }

    /// All documents (leafs and intermediate nodes) matching `glob`.
    pub fn prefixes(&self, tenant: &str, glob: &str) -> crate::Result<Vec<PathDocument>> {
        self.query(tenant, glob, false)
    }

    /// Leaf paths matching `glob`.
    pub fn lookup(&self, tenant: &str, glob: &str) -> crate::Result<Vec<String>> {
        Ok(self
            .query(tenant, glob, true)?
            .into_iter()
            .map(|doc| doc.path)
            .collect())
    }

    fn query(
        &self,
        tenant: &str,
        glob: &str,
        leafs_only: bool,
    ) -> crate::Result<Vec<PathDocument>> {
        let query = SearchQuery {
            tenant: tenant.to_string(),
            depth: segments(glob),
            path_regex: glob::translate(glob),
            leafs_only,
            scroll: SCROLL_TTL.to_string(),
        };

        let SearchPage {
            total,
            hits,
            mut scroll_id,
        } = self.client.search(&query)?;

        if let Some(threshold) = self.config.query_paths_threshold {
            if total > threshold {
                return Err(MicaError::TooManyPaths {
                    requested: total,
                    threshold,
                });
            }
        }

        let mut docs = hits;
        while docs.len() < total {
            let Some(id) = scroll_id.take() else { break };
            let page = self.client.scroll(&id)?;
            if page.hits.is_empty() {
                break;
            }
            docs.extend(page.hits);
            scroll_id = page.scroll_id;
        }

        Ok(docs)
    }

    /// The shared sub-path cache, exposed for operational inspection.
    pub fn cache(&self) -> Arc<SubPathCache> {
        Arc::clone(&self.cache)
    }

    /// Drain the pipeline and stop its threads. In-flight batches are
    /// flushed; callers must drop any [`PathStore::channel`] clones first
    /// or the expand stage keeps waiting for input.
    pub fn shutdown(self) {
        let PathStore {
            ingress, handles, ..
        } = self;
        drop(ingress);
        for handle in handles {
            let _ = handle.join();
        }
    }
}
