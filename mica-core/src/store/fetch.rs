//! Range reads: parallel per-path fetches, per-path reduction, alignment
//! onto the requested timegrid.

use crate::agg::Aggregate;
use crate::error::MicaError;
use crate::store::session::{Row, StoreSession};
use crossbeam_channel::{bounded, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Deadline for the whole per-path gather; one slow path fails the query.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Overrides per-path reducer selection when set.
    pub agg: Option<Aggregate>,
    pub paths: Vec<String>,
    pub tenant: String,
    pub rollup: i32,
    pub period: i32,
    pub from: i64,
    pub to: i64,
}

impl FetchRequest {
    /// Upper bound on returned points, for clients limiting queries up
    /// front.
    pub fn max_points(&self) -> u64 {
        let span = (self.to - self.from).max(0) as u64;
        (span / self.rollup as u64 + 1) * self.paths.len() as u64
    }
}

/// Aligned fetch envelope: `series[path]` holds one value per grid point,
/// `from + k * step`, or null where the store had no row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub from: i64,
    pub to: i64,
    pub step: i32,
    pub series: BTreeMap<String, Vec<Option<f64>>>,
}

pub(crate) fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn align_down(time: i64, step: i64) -> i64 {
    time - time.rem_euclid(step)
}

pub(crate) fn execute(
    session: &Arc<dyn StoreSession>,
    request: &FetchRequest,
) -> crate::Result<FetchResult> {
    let step = request.rollup as i64;
    let from = align_down(request.from, step);
    let to = align_down(request.to.min(now_epoch()), step);

    let rows_by_path = gather(session, request)?;

    let mut series = BTreeMap::new();
    for path in &request.paths {
        let reducer = request.agg.unwrap_or_else(|| Aggregate::for_path(path));
        let rows = rows_by_path
            .get(path.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut by_time: HashMap<i64, f64> = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(value) = reducer.reduce(&row.values) {
                by_time.insert(row.time, value);
            }
        }

        let mut points = Vec::new();
        let mut t = from;
        while t <= to {
            points.push(by_time.get(&t).copied());
            t += step;
        }
        series.insert(path.clone(), points);
    }

    Ok(FetchResult {
        from,
        to,
        step: request.rollup,
        series,
    })
}

/// One read per path through the worker pool, gathered with a deadline.
fn gather(
    session: &Arc<dyn StoreSession>,
    request: &FetchRequest,
) -> crate::Result<HashMap<String, Vec<Row>>> {
    let (tx, rx) = bounded(request.paths.len().max(1));
    for path in &request.paths {
        let session = Arc::clone(session);
        let tx = tx.clone();
        let path = path.clone();
        let tenant = request.tenant.clone();
        let (rollup, period) = (request.rollup, request.period);
        let (from, to) = (request.from, request.to);
        rayon::spawn(move || {
            let rows = session.fetch_rows(&tenant, &path, rollup, period, from, to);
            let _ = tx.send((path, rows));
        });
    }
    drop(tx);

    let deadline = Instant::now() + FETCH_TIMEOUT;
    let mut rows_by_path = HashMap::with_capacity(request.paths.len());
    for _ in 0..request.paths.len() {
        match rx.recv_deadline(deadline) {
            Ok((path, Ok(rows))) => {
                rows_by_path.insert(path, rows);
            }
            // Partial results are never returned.
            Ok((_, Err(e))) => return Err(e),
            Err(RecvTimeoutError::Timeout) => return Err(MicaError::FetchTimeout(FETCH_TIMEOUT)),
            // Workers always send; a disconnect means one died mid-read.
            Err(RecvTimeoutError::Disconnected) => {
                return Err(MicaError::ChannelClosed("fetch worker"))
            }
        }
    }
    Ok(rows_by_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(1_700_000_040, 60), 1_700_000_040);
        assert_eq!(align_down(1_700_000_059, 60), 1_700_000_040);
        assert_eq!(align_down(0, 60), 0);
    }

    #[test]
    fn test_max_points() {
        let request = FetchRequest {
            agg: None,
            paths: vec!["a".into(), "b".into()],
            tenant: "t".into(),
            rollup: 60,
            period: 1440,
            from: 1_700_000_000,
            to: 1_700_000_300,
        };
        assert_eq!(request.max_points(), 12);
    }
}
