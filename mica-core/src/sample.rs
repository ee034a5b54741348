//! Core data types: samples and retention resolutions.

use serde::{Deserialize, Serialize};

/// One metric observation routed through the ingestion pipeline.
///
/// `rollup` is the bucket width in seconds, `period` the retention count;
/// `ttl` is always `rollup * period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tenant: String,
    pub path: String,
    /// Epoch seconds.
    pub time: i64,
    pub metric: f64,
    pub rollup: i32,
    pub period: i32,
    pub ttl: i32,
}

impl Sample {
    pub fn new(
        tenant: impl Into<String>,
        path: impl Into<String>,
        time: i64,
        metric: f64,
        resolution: &Resolution,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            path: path.into(),
            time,
            metric,
            rollup: resolution.rollup,
            period: resolution.period,
            ttl: resolution.ttl(),
        }
    }
}

/// One stored retention resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Bucket width in seconds.
    pub rollup: i32,
    /// Retention count.
    pub period: i32,
}

impl Resolution {
    pub fn new(rollup: i32, period: i32) -> Self {
        Self { rollup, period }
    }

    pub fn ttl(&self) -> i32 {
        self.rollup * self.period
    }

    /// Aligned bucket start for `time`.
    pub fn bucket(&self, time: i64) -> i64 {
        time - time.rem_euclid(self.rollup as i64)
    }
}

/// The ordered resolution set. The base resolution (smallest rollup) is
/// written raw; every other resolution is fed through the rollup cache.
#[derive(Debug, Clone)]
pub struct Resolutions {
    ordered: Vec<Resolution>,
}

impl Resolutions {
    /// Build from an unordered list. Panics on an empty list: a store with
    /// no resolutions cannot place a single sample.
    pub fn new(mut resolutions: Vec<Resolution>) -> Self {
        assert!(!resolutions.is_empty(), "at least one resolution required");
        resolutions.sort_by_key(|r| r.rollup);
        resolutions.dedup();
        Self { ordered: resolutions }
    }

    pub fn base(&self) -> Resolution {
        self.ordered[0]
    }

    pub fn all(&self) -> &[Resolution] {
        &self.ordered
    }

    /// Every resolution above the base, in ascending rollup order.
    pub fn non_base(&self) -> &[Resolution] {
        &self.ordered[1..]
    }

    pub fn find(&self, rollup: i32) -> Option<Resolution> {
        self.ordered.iter().copied().find(|r| r.rollup == rollup)
    }
}
