//! Aggregation functions: pure reducers over the value lists stored per
//! `(tenant, rollup, period, path, time)` key.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reducer applied to a stored value list (or a rollup bucket) to collapse
/// it into one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    #[default]
    #[serde(alias = "avg")]
    Average,
    Sum,
    Min,
    Max,
    Last,
}

impl Aggregate {
    /// Pick the reducer for a metric path by its final segment.
    ///
    /// Counters sum, extrema keep their bound, gauges named `last` keep the
    /// latest value; everything else averages.
    pub fn for_path(path: &str) -> Self {
        match path.rsplit('.').next() {
            Some("count") | Some("sum") => Aggregate::Sum,
            Some("min") | Some("lower") => Aggregate::Min,
            Some("max") | Some("upper") => Aggregate::Max,
            Some("last") => Aggregate::Last,
            _ => Aggregate::Average,
        }
    }

    /// Collapse a value list into one scalar. Empty input yields `None`.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Aggregate::Average => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Last => return values.last().copied(),
        })
    }
}

impl FromStr for Aggregate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" | "average" | "mean" => Ok(Aggregate::Average),
            "sum" => Ok(Aggregate::Sum),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "last" => Ok(Aggregate::Last),
            other => Err(format!("unknown aggregate: {other}")),
        }
    }
}
