//! In-memory rolling aggregation for non-base resolutions.
//!
//! Buckets accumulate sample values until their time window is past, then
//! a sweeper reduces each closed bucket to one sample and re-emits it into
//! the store writer channel. The entry map is a sharded concurrent map, so
//! put and sweep contend only per shard. A late sample arriving after its
//! bucket flushed opens the bucket again and produces a second single-value
//! write, absorbed by the store's list-append semantics.

use crate::agg::Aggregate;
use crate::sample::{Resolution, Sample};
use crate::store::fetch::now_epoch;
use crossbeam_channel::Sender;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub tenant: String,
    pub rollup: i32,
    pub period: i32,
    /// Aligned bucket start.
    pub time: i64,
    pub path: String,
}

struct Bucket {
    values: Vec<f64>,
    ttl: i32,
    last_update: Instant,
}

struct CacheInner {
    entries: DashMap<BucketKey, Bucket>,
    downstream: Sender<Sample>,
    agg: Aggregate,
    grace: Duration,
}

impl CacheInner {
    /// Flush every bucket whose window closed before `now - grace`.
    fn sweep_once(&self, now: i64) -> usize {
        let grace = self.grace.as_secs() as i64;
        self.flush_matching(|key| key.time + key.rollup as i64 + grace < now)
    }

    fn flush_matching(&self, closed: impl Fn(&BucketKey) -> bool) -> usize {
        // Collect first: removing while iterating would hold shard locks.
        let keys: Vec<BucketKey> = self
            .entries
            .iter()
            .filter(|entry| closed(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut flushed = 0;
        for key in keys {
            let Some((key, bucket)) = self.entries.remove(&key) else {
                continue;
            };
            flushed += 1;
            let Some(metric) = self.agg.reduce(&bucket.values) else {
                continue;
            };
            tracing::debug!(
                path = %key.path,
                rollup = key.rollup,
                bucket = key.time,
                samples = bucket.values.len(),
                idle = ?bucket.last_update.elapsed(),
                "flushing rollup bucket"
            );
            let sample = Sample {
                tenant: key.tenant,
                path: key.path,
                time: key.time,
                metric,
                rollup: key.rollup,
                period: key.period,
                ttl: bucket.ttl,
            };
            if self.downstream.send(sample).is_err() {
                tracing::warn!("store channel closed, dropping flushed bucket");
            }
        }
        flushed
    }
}

/// The rollup cache with its background sweeper.
pub struct RollupCache {
    inner: Arc<CacheInner>,
    stop: Arc<AtomicBool>,
    sweeper: Option<JoinHandle<()>>,
}

impl RollupCache {
    pub fn new(
        downstream: Sender<Sample>,
        agg: Aggregate,
        grace: Duration,
        sweep_interval: Duration,
    ) -> Self {
        let inner = Arc::new(CacheInner {
            entries: DashMap::new(),
            downstream,
            agg,
            grace,
        });
        let stop = Arc::new(AtomicBool::new(false));

        let sweep_inner = Arc::clone(&inner);
        let sweep_stop = Arc::clone(&stop);
        let sweeper = thread::Builder::new()
            .name("mica-rollup-sweeper".to_string())
            .spawn(move || {
                while !sweep_stop.load(Ordering::Relaxed) {
                    thread::park_timeout(sweep_interval);
                    if sweep_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    sweep_inner.sweep_once(now_epoch());
                }
            })
            .expect("failed to spawn rollup sweeper thread");

        Self {
            inner,
            stop,
            sweeper: Some(sweeper),
        }
    }

    /// Deposit a sample into its aligned bucket for `resolution`.
    pub fn put(&self, resolution: &Resolution, sample: &Sample) {
        let key = BucketKey {
            tenant: sample.tenant.clone(),
            rollup: resolution.rollup,
            period: resolution.period,
            time: resolution.bucket(sample.time),
            path: sample.path.clone(),
        };
        let mut bucket = self.inner.entries.entry(key).or_insert_with(|| Bucket {
            values: Vec::new(),
            ttl: resolution.ttl(),
            last_update: Instant::now(),
        });
        bucket.values.push(sample.metric);
        bucket.last_update = Instant::now();
    }

    /// Flush buckets closed as of `now`. The sweeper calls this with wall
    /// time; tests call it directly for determinism. Returns the number of
    /// buckets flushed.
    pub fn sweep_once(&self, now: i64) -> usize {
        self.inner.sweep_once(now)
    }

    /// Flush everything, closed or not. Used when draining on shutdown.
    pub fn flush_all(&self) -> usize {
        self.inner.flush_matching(|_| true)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn halt_sweeper(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.sweeper.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }

    /// Stop the sweeper and flush open buckets downstream.
    pub fn shutdown(mut self) {
        self.halt_sweeper();
        self.inner.flush_matching(|_| true);
    }
}

impl Drop for RollupCache {
    fn drop(&mut self) {
        self.halt_sweeper();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn cache_with_channel() -> (RollupCache, crossbeam_channel::Receiver<Sample>) {
        let (tx, rx) = bounded(64);
        // Hour-long sweep interval keeps the background sweeper out of the
        // way; tests drive sweep_once directly.
        let cache = RollupCache::new(
            tx,
            Aggregate::Average,
            Duration::from_secs(0),
            Duration::from_secs(3600),
        );
        (cache, rx)
    }

    fn sample(path: &str, time: i64, metric: f64) -> Sample {
        Sample::new("t", path, time, metric, &Resolution::new(10, 100))
    }

    #[test]
    fn test_accumulates_until_bucket_closes() {
        let (cache, rx) = cache_with_channel();
        let res = Resolution::new(60, 100);

        for (i, v) in [1.0, 2.0, 3.0].iter().enumerate() {
            cache.put(&res, &sample("a.b", 1000 + i as i64 * 5, *v));
        }
        assert_eq!(cache.len(), 1);

        // Bucket [960, 1020) is still open at now=1020.
        assert_eq!(cache.sweep_once(1020), 0);
        assert_eq!(cache.sweep_once(1021), 1);
        assert!(cache.is_empty());

        let flushed = rx.try_recv().unwrap();
        assert_eq!(flushed.time, 960);
        assert_eq!(flushed.metric, 2.0);
        assert_eq!(flushed.rollup, 60);
        assert_eq!(flushed.ttl, 6000);
    }

    #[test]
    fn test_late_sample_reopens_bucket() {
        let (cache, rx) = cache_with_channel();
        let res = Resolution::new(60, 100);

        cache.put(&res, &sample("a.b", 1000, 5.0));
        assert_eq!(cache.sweep_once(2000), 1);
        let first = rx.try_recv().unwrap();
        assert_eq!(first.metric, 5.0);

        // Straggler for the already-flushed bucket: second write, one value.
        cache.put(&res, &sample("a.b", 1010, 7.0));
        assert_eq!(cache.sweep_once(2000), 1);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.time, first.time);
        assert_eq!(second.metric, 7.0);
    }

    #[test]
    fn test_flush_all_drains_open_buckets() {
        let (cache, rx) = cache_with_channel();
        let res = Resolution::new(60, 100);
        cache.put(&res, &sample("a", 1000, 1.0));
        cache.put(&res, &sample("b", 1000, 2.0));
        assert_eq!(cache.flush_all(), 2);
        assert!(cache.is_empty());
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_buckets_separate_per_path() {
        let (cache, _rx) = cache_with_channel();
        let res = Resolution::new(60, 100);
        cache.put(&res, &sample("a", 1000, 1.0));
        cache.put(&res, &sample("b", 1000, 1.0));
        assert_eq!(cache.len(), 2);
    }
}
