//! Batched point writes into the wide-column store.
//!
//! A single bounded channel feeds a dedicated writer thread. Batches go
//! out when full or when the flush interval elapses. The ingest side is
//! recovery-biased: a failed batch is counted, logged and dropped, and the
//! pipeline keeps going.

use crate::batcher::Batcher;
use crate::config::MetricStoreConfig;
use crate::counters::Counters;
use crate::sample::Sample;
use crate::store::fetch::{self, FetchRequest, FetchResult};
use crate::store::session::StoreSession;
use crate::store::MetricStore;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest a partial batch waits before being flushed.
const WRITE_INTERVAL: Duration = Duration::from_secs(5);

pub struct MetricWriter {
    session: Arc<dyn StoreSession>,
    counters: Arc<Counters>,
    ingress: Sender<Sample>,
    handle: JoinHandle<()>,
}

impl MetricWriter {
    pub fn new(
        config: &MetricStoreConfig,
        session: Arc<dyn StoreSession>,
        counters: Arc<Counters>,
    ) -> Self {
        let (tx, rx) = bounded(config.chan_size);
        let batch_size = config.batch_size;
        let writer_session = Arc::clone(&session);
        let writer_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name("mica-store-writer".to_string())
            .spawn(move || writer_loop(rx, batch_size, writer_session, writer_counters))
            .expect("failed to spawn store writer thread");

        Self {
            session,
            counters,
            ingress: tx,
            handle,
        }
    }

    /// Drain buffered samples and stop the writer thread. Callers must
    /// drop their [`MetricStore::channel`] clones first.
    pub fn shutdown(self) {
        let MetricWriter {
            ingress, handle, ..
        } = self;
        drop(ingress);
        let _ = handle.join();
    }
}

impl MetricStore for MetricWriter {
    /// Synchronous single-point write, bypassing the batcher.
    fn insert(&self, sample: &Sample) -> crate::Result<()> {
        match self.session.write_batch(std::slice::from_ref(sample)) {
            Ok(()) => {
                self.counters.add_store_success(1);
                self.counters.add_tenant_write(&sample.tenant, 1);
                Ok(())
            }
            Err(e) => {
                self.counters.add_store_error(1);
                Err(e)
            }
        }
    }

    fn channel(&self) -> Sender<Sample> {
        self.ingress.clone()
    }

    fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchResult> {
        fetch::execute(&self.session, request)
    }
}

fn writer_loop(
    rx: Receiver<Sample>,
    batch_size: usize,
    session: Arc<dyn StoreSession>,
    counters: Arc<Counters>,
) {
    for batch in Batcher::new(rx, batch_size, WRITE_INTERVAL) {
        match session.write_batch(&batch) {
            Ok(()) => {
                counters.add_store_success(batch.len() as u64);
                let mut per_tenant: HashMap<&str, u64> = HashMap::new();
                for sample in &batch {
                    *per_tenant.entry(sample.tenant.as_str()).or_insert(0) += 1;
                }
                for (tenant, count) in per_tenant {
                    counters.add_tenant_write(tenant, count);
                }
                tracing::debug!(written = batch.len(), "flushed sample batch");
            }
            Err(e) => {
                counters.add_store_error(1);
                tracing::warn!(
                    error = %e,
                    batch = batch.len(),
                    "sample batch write failed, dropping batch"
                );
            }
        }
    }
}
