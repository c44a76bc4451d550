//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Performance tracking metrics
    pub samples_recorded: Counter,
    pub enhancements_identified: CounterVec,

    // Enhancement cycle metrics
    pub enhancement_cycles: Counter,
    pub enhancements_applied: Counter,
    pub enhancements_rejected: Counter,
    pub cycle_duration: Histogram,

    // Relationship graph metrics
    pub relationships_created: Counter,
    pub propagations: Counter,

    // Discovery metrics
    pub discovery_requests: CounterVec,
    pub discovery_cache_hits: Counter,
    pub discovery_cache_misses: Counter,

    // Event store metrics
    pub events_published: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let samples_recorded = register_counter_with_registry!(
            Opts::new(
                "performance_samples_recorded_total",
                "Total performance samples recorded"
            ),
            registry
        )?;

        let enhancements_identified = register_counter_vec_with_registry!(
            Opts::new(
                "enhancements_identified_total",
                "Total enhancement candidates identified"
            ),
            &["source"],
            registry
        )?;

        let enhancement_cycles = register_counter_with_registry!(
            Opts::new("enhancement_cycles_total", "Total enhancement cycles run"),
            registry
        )?;

        let enhancements_applied = register_counter_with_registry!(
            Opts::new("enhancements_applied_total", "Total enhancements applied"),
            registry
        )?;

        let enhancements_rejected = register_counter_with_registry!(
            Opts::new("enhancements_rejected_total", "Total enhancements rejected"),
            registry
        )?;

        let cycle_duration = register_histogram_with_registry!(
            "enhancement_cycle_duration_seconds",
            "Enhancement cycle duration in seconds",
            registry
        )?;

        let relationships_created = register_counter_with_registry!(
            Opts::new(
                "relationships_created_total",
                "Total workflow relationships created"
            ),
            registry
        )?;

        let propagations = register_counter_with_registry!(
            Opts::new(
                "enhancement_propagations_total",
                "Total enhancements propagated through the graph"
            ),
            registry
        )?;

        let discovery_requests = register_counter_vec_with_registry!(
            Opts::new("discovery_requests_total", "Total discovery requests"),
            &["status"],
            registry
        )?;

        let discovery_cache_hits = register_counter_with_registry!(
            Opts::new("discovery_cache_hits_total", "Total discovery cache hits"),
            registry
        )?;

        let discovery_cache_misses = register_counter_with_registry!(
            Opts::new(
                "discovery_cache_misses_total",
                "Total discovery cache misses"
            ),
            registry
        )?;

        let events_published = register_counter_vec_with_registry!(
            Opts::new("events_published_total", "Total events published"),
            &["type"],
            registry
        )?;

        Ok(Self {
            registry,
            samples_recorded,
            enhancements_identified,
            enhancement_cycles,
            enhancements_applied,
            enhancements_rejected,
            cycle_duration,
            relationships_created,
            propagations,
            discovery_requests,
            discovery_cache_hits,
            discovery_cache_misses,
            events_published,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
