//! The streaming path-index pipeline: expand, filter, write.
//!
//! Three stages over bounded channels, one thread per stage, each draining
//! its input through a size-or-time batcher. Backpressure is the only flow
//! control: a full channel blocks the upstream stage, and a full ingress
//! channel blocks the producer. Failures are logged and the batch dropped;
//! a later sample for the same path misses the filter stage again and gets
//! re-written.

use super::cache::{SubPathCache, STORE_TO_DEPTH};
use super::client::IndexClient;
use super::decompose::decompose;
use super::PathDocument;
use crate::batcher::Batcher;
use crate::config::PathStoreConfig;
use crate::counters::Counters;
use crossbeam_channel::{bounded, Sender};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// `(path, tenant)` pairs as pushed by the ingest collaborator.
pub type PathInput = (String, String);

/// Longest a stage buffers a partial batch before emitting it.
const STAGE_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) struct Pipeline {
    pub ingress: Sender<PathInput>,
    pub handles: Vec<JoinHandle<()>>,
}

pub(crate) fn spawn(
    config: &PathStoreConfig,
    client: Arc<dyn IndexClient>,
    cache: Arc<SubPathCache>,
    counters: Arc<Counters>,
) -> Pipeline {
    let (in_tx, in_rx) = bounded::<PathInput>(config.chan_size);
    let (doc_tx, doc_rx) = bounded::<PathDocument>(config.chan_size);
    let (miss_tx, miss_rx) = bounded::<PathDocument>(config.chan_size);
    let batch_size = config.batch_size;

    let expand_cache = Arc::clone(&cache);
    let expand = thread::Builder::new()
        .name("mica-path-expand".to_string())
        .spawn(move || {
            for pairs in Batcher::new(in_rx, batch_size, STAGE_INTERVAL) {
                let mut seen = HashSet::with_capacity(pairs.len());
                for (path, tenant) in &pairs {
                    for doc in decompose(tenant, path, &expand_cache) {
                        if !seen.insert(doc.id()) {
                            continue;
                        }
                        if doc_tx.send(doc).is_err() {
                            return;
                        }
                    }
                }
            }
        })
        .expect("failed to spawn path expand thread");

    let filter_client = Arc::clone(&client);
    let filter = thread::Builder::new()
        .name("mica-path-filter".to_string())
        .spawn(move || {
            for docs in Batcher::new(doc_rx, batch_size, STAGE_INTERVAL) {
                let ids: Vec<String> = docs.iter().map(|d| d.id()).collect();
                let existing = match filter_client.multi_get(&ids) {
                    Ok(existing) => existing,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            batch = docs.len(),
                            "path existence check failed, dropping batch"
                        );
                        continue;
                    }
                };

                let mut known = Vec::new();
                for doc in docs {
                    if existing.contains(doc.id().as_str()) {
                        if !doc.leaf && doc.depth <= STORE_TO_DEPTH {
                            known.push(doc.id());
                        }
                    } else if miss_tx.send(doc).is_err() {
                        return;
                    }
                }
                // Union only after the check succeeded for the whole batch.
                if !known.is_empty() {
                    cache.extend(known);
                }
            }
        })
        .expect("failed to spawn path filter thread");

    let write = thread::Builder::new()
        .name("mica-path-write".to_string())
        .spawn(move || {
            for docs in Batcher::new(miss_rx, batch_size, STAGE_INTERVAL) {
                match client.bulk_upsert(&docs) {
                    Ok(()) => {
                        counters.add_index_create(docs.len() as u64);
                        tracing::debug!(created = docs.len(), "indexed new path documents");
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            batch = docs.len(),
                            "bulk path upsert failed, dropping batch"
                        );
                    }
                }
            }
        })
        .expect("failed to spawn path write thread");

    Pipeline {
        ingress: in_tx,
        handles: vec![expand, filter, write],
    }
}
