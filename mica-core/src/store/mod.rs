//! Metric store: batched point writes, rollup caching, aligned reads.

pub mod fetch;
pub mod middleware;
pub mod rollup;
pub mod session;
pub mod writer;

use crate::sample::Sample;
use crossbeam_channel::Sender;
use fetch::{FetchRequest, FetchResult};

/// The one store contract ingest and query collaborators see. Implemented
/// by the raw writer and by the rollup-caching middleware that wraps it.
pub trait MetricStore: Send + Sync {
    /// Synchronous single-point write.
    fn insert(&self, sample: &Sample) -> crate::Result<()>;

    /// Streaming ingress; sends block when the writer is saturated.
    fn channel(&self) -> Sender<Sample>;

    /// Aligned range read over a set of paths.
    fn fetch(&self, request: &FetchRequest) -> crate::Result<FetchResult>;
}
