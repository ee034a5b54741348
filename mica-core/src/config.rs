//! Configuration for the ingestion and query core.
//!
//! The core itself only consumes channel sizes, batch sizes, thresholds and
//! the rollup set; backend addressing (index name, cluster contact points)
//! is parsed here so the embedding daemon hands concrete clients a single
//! validated view.

use crate::agg::Aggregate;
use crate::sample::{Resolution, Resolutions};
use crate::MicaError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Mica Configuration

[path_store]
# Search index holding path documents
index = "mica_paths"
url = "http://localhost:9200"
chan_size = 10000
batch_size = 300
# Fail glob queries matching more paths than this (unset = unlimited)
# query_paths_threshold = 10000

[metric_store]
keyspace = "mica"
cluster = "localhost"
hints = true
chan_size = 10000
batch_size = 100

[middleware]
chan_size = 10000
# Reducer applied when a rollup bucket closes
rollup_agg = "avg"
# How long past the end of a bucket to wait for stragglers
grace = "5s"
sweep_interval = "1s"

[[middleware.rollups]]
rollup = 10
period = 60480

[[middleware.rollups]]
rollup = 600
period = 105120
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub path_store: PathStoreConfig,
    #[serde(default)]
    pub metric_store: MetricStoreConfig,
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStoreConfig {
    #[serde(default = "default_index")]
    pub index: String,
    /// Full endpoint URL; takes precedence over `host`/`port`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default = "default_chan_size")]
    pub chan_size: usize,
    #[serde(default = "default_path_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub query_paths_threshold: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStoreConfig {
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    #[serde(default)]
    pub cluster: Cluster,
    /// Whether the cluster driver should use hinted handoff.
    #[serde(default = "default_true")]
    pub hints: bool,
    #[serde(default = "default_chan_size")]
    pub chan_size: usize,
    #[serde(default = "default_store_batch_size")]
    pub batch_size: usize,
}

/// Cluster contact points: a single host or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cluster {
    One(String),
    Many(Vec<String>),
}

impl Cluster {
    pub fn contact_points(&self) -> Vec<String> {
        match self {
            Cluster::One(host) => vec![host.clone()],
            Cluster::Many(hosts) => hosts.clone(),
        }
    }
}

impl Default for Cluster {
    fn default() -> Self {
        Cluster::One("localhost".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    #[serde(default = "default_chan_size")]
    pub chan_size: usize,
    #[serde(default)]
    pub rollup_agg: Aggregate,
    #[serde(default = "default_grace")]
    pub grace: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
    #[serde(default = "default_rollups")]
    pub rollups: Vec<RollupEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RollupEntry {
    pub rollup: i32,
    pub period: i32,
}

impl MiddlewareConfig {
    pub fn resolutions(&self) -> Resolutions {
        Resolutions::new(
            self.rollups
                .iter()
                .map(|r| Resolution::new(r.rollup, r.period))
                .collect(),
        )
    }

    pub fn grace_duration(&self) -> Duration {
        parse_duration(&self.grace).unwrap_or(Duration::from_secs(5))
    }

    pub fn sweep_interval_duration(&self) -> Duration {
        parse_duration(&self.sweep_interval).unwrap_or(Duration::from_secs(1))
    }
}

// Default value functions
fn default_index() -> String {
    "mica_paths".to_string()
}
fn default_keyspace() -> String {
    "mica".to_string()
}
fn default_chan_size() -> usize {
    10_000
}
fn default_path_batch_size() -> usize {
    300
}
fn default_store_batch_size() -> usize {
    100
}
fn default_true() -> bool {
    true
}
fn default_grace() -> String {
    "5s".to_string()
}
fn default_sweep_interval() -> String {
    "1s".to_string()
}
fn default_rollups() -> Vec<RollupEntry> {
    vec![
        RollupEntry { rollup: 10, period: 60_480 },
        RollupEntry { rollup: 600, period: 105_120 },
    ]
}

impl Default for PathStoreConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            url: None,
            host: None,
            port: None,
            cluster_name: None,
            chan_size: default_chan_size(),
            batch_size: default_path_batch_size(),
            query_paths_threshold: None,
        }
    }
}

impl Default for MetricStoreConfig {
    fn default() -> Self {
        Self {
            keyspace: default_keyspace(),
            cluster: Cluster::default(),
            hints: default_true(),
            chan_size: default_chan_size(),
            batch_size: default_store_batch_size(),
        }
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            chan_size: default_chan_size(),
            rollup_agg: Aggregate::default(),
            grace: default_grace(),
            sweep_interval: default_sweep_interval(),
            rollups: default_rollups(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MicaError::ConfigParse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse config from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| MicaError::ConfigParse(e.to_string()))
    }
}

/// Parse duration string (e.g., "30s", "5m", "1h")
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.len() < 2 {
        return None;
    }

    let (num_str, unit) = s.split_at(s.len() - 1);
    let num: u64 = num_str.parse().ok()?;

    match unit {
        "s" => Some(Duration::from_secs(num)),
        "m" => Some(Duration::from_secs(num * 60)),
        "h" => Some(Duration::from_secs(num * 3600)),
        "d" => Some(Duration::from_secs(num * 86400)),
        _ => None,
    }
}
