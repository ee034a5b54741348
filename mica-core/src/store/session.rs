//! Capability seam for the wide-column store.
//!
//! One table holds every resolution; the value cell is a list that
//! accumulates on write, so re-delivery of a sample only lengthens the
//! list and the read-side reducer absorbs it. Implementations execute
//! writes as one atomic batch at consistency `any` and map driver
//! failures to [`crate::MicaError::BackendUnavailable`] /
//! [`crate::MicaError::BatchWriteFailed`].

use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Table layout for the metric store.
pub const METRIC_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS metric (
    tenant text,
    rollup int,
    period int,
    path text,
    time bigint,
    data list<double>,
    PRIMARY KEY ((tenant, rollup, period, path), time)
);";

/// Append-semantics point write, one statement per sample in a batch.
pub const INSERT_CQL: &str = "UPDATE metric USING TTL ? \
    SET data = data + ? \
    WHERE tenant = ? AND rollup = ? AND period = ? AND path = ? AND time = ?;";

/// Range read for one `(tenant, path)` at one resolution.
pub const FETCH_CQL: &str = "SELECT time, data FROM metric \
    WHERE tenant = ? AND rollup = ? AND period = ? AND path = ? \
    AND time >= ? AND time <= ?;";

/// One stored row: the accumulated value list at a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub time: i64,
    pub values: Vec<f64>,
}

pub trait StoreSession: Send + Sync {
    /// Execute one batch of list-append writes atomically.
    fn write_batch(&self, samples: &[Sample]) -> crate::Result<()>;

    /// All rows for `(tenant, path)` at the given resolution with
    /// `from <= time <= to`.
    fn fetch_rows(
        &self,
        tenant: &str,
        path: &str,
        rollup: i32,
        period: i32,
        from: i64,
        to: i64,
    ) -> crate::Result<Vec<Row>>;
}
