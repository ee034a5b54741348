//! Mica Core - Multi-tenant metric ingestion and query core
//!
//! This library accepts a stream of `(tenant, path, time, value)` samples,
//! batches them into a wide-column time-series store across multiple
//! retention resolutions, keeps a searchable index of dotted metric names,
//! and serves aligned range reads with Graphite-style glob lookup.

pub mod agg;
mod batcher;
pub mod config;
pub mod counters;
pub mod error;
pub mod path;
pub mod sample;
pub mod store;

pub use agg::Aggregate;
pub use config::{Config, MetricStoreConfig, MiddlewareConfig, PathStoreConfig};
pub use counters::{Counters, CountersSnapshot};
pub use error::MicaError;
pub use path::{document_id, PathDocument, PathStore};
pub use sample::{Resolution, Resolutions, Sample};
pub use store::fetch::{FetchRequest, FetchResult, FETCH_TIMEOUT};
pub use store::middleware::CacheMiddleware;
pub use store::rollup::RollupCache;
pub use store::writer::MetricWriter;
pub use store::MetricStore;

/// Result type alias for mica operations
pub type Result<T> = std::result::Result<T, MicaError>;
