//! Configuration for the workflow mesh
//!
//! Every tunable threshold used by the core services lives here with its
//! documented default, so embedders can load one `MeshConfig` from a file
//! plus `WORKFLOW_MESH_*` environment overrides.

use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level mesh configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshConfig {
    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub enhancement: EnhancementConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MeshConfig {
    /// Load configuration from an optional TOML file and environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WORKFLOW_MESH").separator("__"),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MeshError::Configuration(e.to_string()))
    }
}

/// Performance tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Samples retained per workflow (FIFO eviction beyond this)
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Minimum samples before trends and detectors run
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Values fed into each trend regression
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Samples inspected by the enhancement detectors
    #[serde(default = "default_detector_window")]
    pub detector_window: usize,

    /// Slope magnitude below which a trend reads as stable
    #[serde(default = "default_stable_slope")]
    pub stable_slope: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            min_samples: default_min_samples(),
            trend_window: default_trend_window(),
            detector_window: default_detector_window(),
            stable_slope: default_stable_slope(),
        }
    }
}

fn default_history_cap() -> usize {
    100
}

fn default_min_samples() -> usize {
    5
}

fn default_trend_window() -> usize {
    20
}

fn default_detector_window() -> usize {
    10
}

fn default_stable_slope() -> f64 {
    0.01
}

/// Enhancement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// Applied/rejected history retained per workflow
    #[serde(default = "default_enhancement_history_cap")]
    pub history_cap: usize,

    /// Training data points retained per learning model
    #[serde(default = "default_training_cap")]
    pub training_cap: usize,

    /// Minimum validation confidence required to apply
    #[serde(default = "default_apply_confidence")]
    pub apply_confidence: f64,

    /// Impact discount applied to enhancements adapted from peers
    #[serde(default = "default_peer_discount")]
    pub peer_discount: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            history_cap: default_enhancement_history_cap(),
            training_cap: default_training_cap(),
            apply_confidence: default_apply_confidence(),
            peer_discount: default_peer_discount(),
        }
    }
}

fn default_enhancement_history_cap() -> usize {
    500
}

fn default_training_cap() -> usize {
    1000
}

fn default_apply_confidence() -> f64 {
    0.6
}

fn default_peer_discount() -> f64 {
    0.8
}

/// Discovery service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// TTL for per-query result caching
    #[serde(default = "default_query_cache_ttl_ms")]
    pub query_cache_ttl_ms: u64,

    /// TTL for aggregate network statistics
    #[serde(default = "default_stats_cache_ttl_ms")]
    pub stats_cache_ttl_ms: u64,

    /// Maximum cached query signatures
    #[serde(default = "default_query_cache_size")]
    pub query_cache_size: usize,

    /// Per-hub request timeout
    #[serde(default = "default_hub_timeout_ms")]
    pub hub_timeout_ms: u64,

    /// Overall fan-out timeout
    #[serde(default = "default_fanout_timeout_ms")]
    pub fanout_timeout_ms: u64,

    /// Maximum hubs queried concurrently during fan-out
    #[serde(default = "default_max_concurrent_hubs")]
    pub max_concurrent_hubs: usize,

    /// Reputation above which the progressive search fast path triggers
    #[serde(default = "default_fast_path_reputation")]
    pub fast_path_reputation: f64,

    /// Results needed above the fast-path reputation to skip the broad pass
    #[serde(default = "default_fast_path_count")]
    pub fast_path_count: usize,

    /// Minimum capability/requirement overlap for similarity matches
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Default result limit per remote query
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            query_cache_ttl_ms: default_query_cache_ttl_ms(),
            stats_cache_ttl_ms: default_stats_cache_ttl_ms(),
            query_cache_size: default_query_cache_size(),
            hub_timeout_ms: default_hub_timeout_ms(),
            fanout_timeout_ms: default_fanout_timeout_ms(),
            max_concurrent_hubs: default_max_concurrent_hubs(),
            fast_path_reputation: default_fast_path_reputation(),
            fast_path_count: default_fast_path_count(),
            similarity_threshold: default_similarity_threshold(),
            query_limit: default_query_limit(),
        }
    }
}

impl DiscoveryConfig {
    pub fn query_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.query_cache_ttl_ms)
    }

    pub fn stats_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.stats_cache_ttl_ms)
    }

    pub fn hub_timeout(&self) -> Duration {
        Duration::from_millis(self.hub_timeout_ms)
    }

    pub fn fanout_timeout(&self) -> Duration {
        Duration::from_millis(self.fanout_timeout_ms)
    }
}

fn default_query_cache_ttl_ms() -> u64 {
    120_000
}

fn default_stats_cache_ttl_ms() -> u64 {
    300_000
}

fn default_query_cache_size() -> usize {
    256
}

fn default_hub_timeout_ms() -> u64 {
    5_000
}

fn default_fanout_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_hubs() -> usize {
    10
}

fn default_fast_path_reputation() -> f64 {
    0.75
}

fn default_fast_path_count() -> usize {
    3
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_query_limit() -> usize {
    50
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
