//! Store middleware: fan-out of base samples into every configured
//! resolution.
//!
//! Base-resolution samples are ground truth and go to the writer raw; the
//! same observation is deposited into the rollup cache once per non-base
//! resolution, each bucket aligned by that resolution's own width.

use crate::config::MiddlewareConfig;
use crate::sample::{Resolutions, Sample};
use crate::store::fetch::{FetchRequest, FetchResult};
use crate::store::rollup::RollupCache;
use crate::store::writer::MetricWriter;
use crate::store::MetricStore;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct CacheMiddleware {
    store: MetricWriter,
    cache: Arc<RollupCache>,
    resolutions: Resolutions,
    ingress: Sender<Sample>,
    dispatcher: JoinHandle<()>,
}

impl CacheMiddleware {
    /// Wrap `store` behind one metric-store surface, with a rollup cache
    /// assembled from `config` (reducer, grace window, sweep cadence) and
    /// flushing into `store`'s channel.
    pub fn new(config: &MiddlewareConfig, store: MetricWriter) -> Self {
        let resolutions = config.resolutions();
        let cache = Arc::new(RollupCache::new(
            store.channel(),
            config.rollup_agg,
            config.grace_duration(),
            config.sweep_interval_duration(),
        ));
        let (tx, rx) = bounded(config.chan_size);

        let store_tx = store.channel();
        let dispatch_cache = Arc::clone(&cache);
        let dispatch_resolutions = resolutions.clone();
        let dispatcher = thread::Builder::new()
            .name("mica-store-dispatch".to_string())
            .spawn(move || dispatch_loop(rx, dispatch_resolutions, store_tx, dispatch_cache))
            .expect("failed to spawn store dispatch thread");

        Self {
            store,
            cache,
            resolutions,
            ingress: tx,
            dispatcher,
        }
    }

    /// The wrapped rollup cache, exposed for operational inspection.
    pub fn rollup_cache(&self) -> &RollupCache {
        &self.cache
    }

    /// Drain in order: dispatcher first, then the rollup cache (open
    /// buckets flush into the writer), then the writer itself. Callers
    /// must drop their channel clones first.
    pub fn shutdown(self) {
        let CacheMiddleware {
            store,
            cache,
            ingress,
            dispatcher,
            ..
        } = self;
        drop(ingress);
        let _ = dispatcher.join();
        match Arc::try_unwrap(cache) {
            Ok(cache) => cache.shutdown(),
            // A clone is still live somewhere; its sweeper stops when the
            // last reference drops.
            Err(cache) => drop(cache),
        }
        store.shutdown();
    }
}

impl MetricStore for CacheMiddleware {
    fn insert(&self, sample: &Sample) -> crate::Result<()> {
        let base = self.resolutions.base();
        if sample.rollup == base.rollup {
            self.store.insert(sample)?;
            for resolution in self.resolutions.non_base() {
                self.cache.put(resolution, sample);
            }
        } else if let Some(resolution) = self.resolutions.find(sample.rollup) {
            self.cache.put(&resolution, sample);
        } else {
            tracing::warn!(rollup = sample.rollup, "sample for unconfigured resolution dropped");
        }
        Ok(())
    }

    fn channel(&self) -> Sender<Sample> {
        self.ingress.clone()
    }

    /// Reads bypass the cache entirely; flushed buckets are already in the
    /// underlying store.
    fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchResult> {
        self.store.fetch(request)
    }
}

fn dispatch_loop(
    rx: Receiver<Sample>,
    resolutions: Resolutions,
    store_tx: Sender<Sample>,
    cache: Arc<RollupCache>,
) {
    let base = resolutions.base();
    for sample in rx.iter() {
        if sample.rollup == base.rollup {
            for resolution in resolutions.non_base() {
                cache.put(resolution, &sample);
            }
            if store_tx.send(sample).is_err() {
                tracing::warn!("store writer channel closed, stopping dispatch");
                return;
            }
        } else if let Some(resolution) = resolutions.find(sample.rollup) {
            cache.put(&resolution, &sample);
        } else {
            tracing::warn!(rollup = sample.rollup, "sample for unconfigured resolution dropped");
        }
    }
}
