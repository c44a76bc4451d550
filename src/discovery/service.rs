//! Cross-hub workflow discovery and ranking
//!
//! Public methods here never return transport errors: a failed hub query
//! degrades to an empty contribution (logged), and statistics fall back
//! to cached values. Fallibility stays at the [`EventStore`] boundary.

use super::cache::{QueryCache, StatsCache};
use super::models::*;
use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::events::models::{
    self, Event, EventFilter, TAG_AI_ACCESS_COUNT, TAG_AI_IMPORTANCE, TAG_WORKFLOW_CAPABILITY,
    TAG_WORKFLOW_PERFORMANCE, TAG_WORKFLOW_REQUIREMENT, VIS_DISCOVERABLE, VIS_PUBLIC,
};
use crate::events::store::EventStore;
use crate::metrics::METRICS;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Fixed keyword-to-capability table for the progressive search's first,
/// broad pass
const CAPABILITY_KEYWORDS: [(&str, &str); 10] = [
    ("json", "format-conversion"),
    ("xml", "format-conversion"),
    ("csv", "format-conversion"),
    ("convert", "format-conversion"),
    ("automat", "workflow-automation"),
    ("schedul", "workflow-automation"),
    ("orchestrat", "workflow-automation"),
    ("analy", "data-analysis"),
    ("monitor", "monitoring"),
    ("alert", "monitoring"),
];

const DEFAULT_CAPABILITY: &str = "data-processing";

/// Queries hubs for workflow-tagged events and ranks the results
pub struct DiscoveryService {
    store: Arc<dyn EventStore>,
    config: DiscoveryConfig,
    hubs: RwLock<Vec<String>>,
    query_cache: QueryCache,
    stats_cache: StatsCache,
}

impl DiscoveryService {
    pub fn new(store: Arc<dyn EventStore>, config: DiscoveryConfig) -> Self {
        let query_cache = QueryCache::new(config.query_cache_ttl(), config.query_cache_size);
        let stats_cache = StatsCache::new(config.stats_cache_ttl());
        Self {
            store,
            config,
            hubs: RwLock::new(Vec::new()),
            query_cache,
            stats_cache,
        }
    }

    /// Add a hub process to the discovery registry
    pub fn register_hub(&self, hub_id: &str) {
        let mut hubs = self.hubs.write().unwrap();
        if !hubs.iter().any(|h| h == hub_id) {
            hubs.push(hub_id.to_string());
        }
    }

    pub fn registered_hubs(&self) -> Vec<String> {
        self.hubs.read().unwrap().clone()
    }

    /// Canonical reputation formula; always lands in [0, 1]
    pub fn compute_reputation(
        metrics: &WorkflowMetrics,
        access_count: u64,
        importance: f64,
    ) -> f64 {
        let enhancement_signal = if metrics.has_enhancements() { 0.8 } else { 0.2 };
        0.3 * metrics.quality_score.clamp(0.0, 1.0)
            + 0.25 * metrics.success_rate.clamp(0.0, 1.0)
            + 0.2 * (access_count as f64 / 100.0).min(1.0)
            + 0.15 * enhancement_signal
            + 0.1 * importance.clamp(0.0, 1.0)
    }

    /// Project a hub event into a workflow descriptor
    ///
    /// Malformed `workflow_performance` JSON is swallowed; neutral metrics
    /// take its place.
    pub fn convert_event(hub_id: &str, event: &Event) -> RemoteWorkflow {
        let performance = event
            .tag(TAG_WORKFLOW_PERFORMANCE)
            .and_then(|json| serde_json::from_str::<WorkflowMetrics>(json).ok())
            .unwrap_or_else(WorkflowMetrics::neutral);

        let usage_count = event
            .tag(TAG_AI_ACCESS_COUNT)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let importance = event
            .tag(TAG_AI_IMPORTANCE)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        let description: String = event.content.chars().take(200).collect();
        let name = event
            .tag("workflow_name")
            .map(str::to_string)
            .unwrap_or_else(|| event.id.clone());

        let reputation_score = Self::compute_reputation(&performance, usage_count, importance);

        RemoteWorkflow {
            workflow_id: event.id.clone(),
            hub_id: hub_id.to_string(),
            owner_address: event.tag("p").unwrap_or_default().to_string(),
            name,
            description,
            capabilities: event.tag_values(TAG_WORKFLOW_CAPABILITY).to_vec(),
            requirements: event.tag_values(TAG_WORKFLOW_REQUIREMENT).to_vec(),
            tags: event.tag_values(models::TAG_AI_TAG).to_vec(),
            performance,
            reputation_score,
            is_public: event.has_visibility(&[VIS_PUBLIC]),
            usage_count,
            created_at: event.created_at,
        }
    }

    /// Three-tier fuzzy comparator: reputation decides outright past a 0.1
    /// gap, then quality past 0.05, then usage count
    pub fn rank_workflows(workflows: &mut [RemoteWorkflow]) {
        workflows.sort_by(Self::compare);
    }

    fn compare(a: &RemoteWorkflow, b: &RemoteWorkflow) -> Ordering {
        let reputation_gap = b.reputation_score - a.reputation_score;
        if reputation_gap.abs() > 0.1 {
            return reputation_gap.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
        }

        let quality_gap = b.performance.quality_score - a.performance.quality_score;
        if quality_gap.abs() > 0.05 {
            return quality_gap.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
        }

        b.usage_count.cmp(&a.usage_count)
    }

    fn discoverable_filter() -> EventFilter {
        EventFilter::for_memory_type("workflow").with_tag(
            models::TAG_AI_TAG,
            vec![VIS_PUBLIC.to_string(), VIS_DISCOVERABLE.to_string()],
        )
    }

    /// Find discoverable workflows advertising one capability
    pub async fn find_by_capability(&self, capability: &str) -> Vec<RemoteWorkflow> {
        let signature = QuerySignature {
            capability: Some(capability.to_string()),
            limit: self.config.query_limit,
            ..Default::default()
        };
        if let Some(cached) = self.query_cache.get(&signature) {
            return cached;
        }

        let filter = Self::discoverable_filter()
            .with_tag(TAG_WORKFLOW_CAPABILITY, vec![capability.to_string()])
            .with_limit(self.config.query_limit);

        let mut results = self.query_all_hubs(&filter).await;
        Self::rank_workflows(&mut results);
        self.query_cache.store(&signature, results.clone());
        results
    }

    /// Find discoverable workflows satisfying one requirement
    pub async fn find_by_requirement(&self, requirement: &str) -> Vec<RemoteWorkflow> {
        let signature = QuerySignature {
            requirements: vec![requirement.to_string()],
            limit: self.config.query_limit,
            ..Default::default()
        };
        if let Some(cached) = self.query_cache.get(&signature) {
            return cached;
        }

        let filter = Self::discoverable_filter()
            .with_tag(TAG_WORKFLOW_REQUIREMENT, vec![requirement.to_string()])
            .with_limit(self.config.query_limit);

        let mut results = self.query_all_hubs(&filter).await;
        Self::rank_workflows(&mut results);
        self.query_cache.store(&signature, results.clone());
        results
    }

    /// Map a free-text query onto one primary capability
    pub fn primary_capability(query: &str) -> &'static str {
        let lowered = query.to_lowercase();
        for (keyword, capability) in CAPABILITY_KEYWORDS {
            if lowered.contains(keyword) {
                return capability;
            }
        }
        DEFAULT_CAPABILITY
    }

    /// Progressive broad-to-narrow free-text search
    ///
    /// A broad capability pass runs first; when it already yields enough
    /// high-reputation results the second text pass (and its network
    /// round-trip) is skipped. Otherwise both result sets merge, broad
    /// results winning ID collisions, and the union is re-ranked.
    pub async fn find_workflows(&self, query: &str) -> Vec<RemoteWorkflow> {
        let capability = Self::primary_capability(query);
        debug!("Progressive search: query='{}' capability='{}'", query, capability);

        let broad = self.find_by_capability(capability).await;

        let strong = broad
            .iter()
            .filter(|w| w.reputation_score > self.config.fast_path_reputation)
            .count();
        if strong >= self.config.fast_path_count {
            debug!("Fast path: {} strong results, skipping text pass", strong);
            return broad;
        }

        let signature = QuerySignature {
            search: Some(query.to_string()),
            limit: self.config.query_limit,
            ..Default::default()
        };
        let narrow = match self.query_cache.get(&signature) {
            Some(cached) => cached,
            None => {
                let filter = Self::discoverable_filter()
                    .with_search(query)
                    .with_limit(self.config.query_limit);
                let results = self.query_all_hubs(&filter).await;
                self.query_cache.store(&signature, results.clone());
                results
            }
        };

        let mut merged: HashMap<String, RemoteWorkflow> = HashMap::new();
        for workflow in narrow {
            merged.insert(workflow.workflow_id.clone(), workflow);
        }
        for workflow in broad {
            merged.insert(workflow.workflow_id.clone(), workflow);
        }

        let mut union: Vec<RemoteWorkflow> = merged.into_values().collect();
        Self::rank_workflows(&mut union);
        union
    }

    /// Workflows overlapping a reference capability or requirement set
    ///
    /// Overlap is `|intersection| / max(|a|, |b|)` per set; a candidate
    /// stays when either overlap reaches the similarity threshold.
    pub async fn find_similar_workflows(
        &self,
        capabilities: &[String],
        requirements: &[String],
    ) -> Vec<RemoteWorkflow> {
        let signature = QuerySignature {
            limit: self.config.query_limit,
            ..Default::default()
        };
        let candidates = match self.query_cache.get(&signature) {
            Some(cached) => cached,
            None => {
                let filter = Self::discoverable_filter().with_limit(self.config.query_limit);
                let results = self.query_all_hubs(&filter).await;
                self.query_cache.store(&signature, results.clone());
                results
            }
        };

        let mut similar: Vec<RemoteWorkflow> = candidates
            .into_iter()
            .filter(|candidate| {
                overlap(capabilities, &candidate.capabilities) >= self.config.similarity_threshold
                    || overlap(requirements, &candidate.requirements)
                        >= self.config.similarity_threshold
            })
            .collect();

        Self::rank_workflows(&mut similar);
        similar
    }

    /// Query every registered hub for basic info
    ///
    /// Unreachable hubs are skipped with a warning.
    pub async fn discover_hubs(&self) -> Vec<HubInfo> {
        let mut infos = Vec::new();

        for hub_id in self.registered_hubs() {
            match self.hub_info(&hub_id).await {
                Ok(info) => infos.push(info),
                Err(e) => warn!("Skipping unreachable hub {}: {}", hub_id, e),
            }
        }

        infos
    }

    async fn hub_info(&self, hub_id: &str) -> Result<HubInfo> {
        let filter = Self::discoverable_filter();
        let events = self.store.fetch_events(hub_id, &[filter]).await?;

        let workflows: Vec<RemoteWorkflow> = events
            .iter()
            .filter(|e| e.has_visibility(&[VIS_PUBLIC, VIS_DISCOVERABLE]))
            .map(|e| Self::convert_event(hub_id, e))
            .collect();

        let average_quality = if workflows.is_empty() {
            0.0
        } else {
            workflows
                .iter()
                .map(|w| w.performance.quality_score)
                .sum::<f64>()
                / workflows.len() as f64
        };
        let reputation =
            0.7 * average_quality + 0.3 * (workflows.len() as f64 * 0.02).min(1.0);

        Ok(HubInfo {
            hub_id: hub_id.to_string(),
            workflow_count: workflows.len(),
            average_quality,
            reputation,
        })
    }

    /// Aggregate statistics over the hub network
    ///
    /// Bounded-concurrency fan-out with per-hub and overall timeouts. A
    /// total failure falls back to the last cached statistics, then to an
    /// all-zero default.
    pub async fn network_statistics(&self) -> NetworkStatistics {
        if let Some(fresh) = self.stats_cache.get_fresh() {
            return fresh;
        }

        let hubs = self.registered_hubs();
        let per_hub_timeout = self.config.hub_timeout();

        let fan_out = stream::iter(hubs.iter())
            .map(|hub_id| async move {
                match timeout(per_hub_timeout, self.collect_hub_workflows(hub_id)).await {
                    Ok(Ok(workflows)) => Some(workflows),
                    Ok(Err(e)) => {
                        warn!("Hub {} failed during statistics fan-out: {}", hub_id, e);
                        None
                    }
                    Err(_) => {
                        warn!("Hub {} timed out during statistics fan-out", hub_id);
                        None
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_hubs)
            .collect::<Vec<Option<Vec<RemoteWorkflow>>>>();

        let collected = match timeout(self.config.fanout_timeout(), fan_out).await {
            Ok(collected) => collected,
            Err(_) => {
                warn!("Network statistics fan-out exceeded overall timeout");
                METRICS.discovery_requests.with_label_values(&["degraded"]).inc();
                return self.stats_cache.get_any().unwrap_or_default();
            }
        };

        let reachable: Vec<Vec<RemoteWorkflow>> = collected.into_iter().flatten().collect();
        if reachable.is_empty() && !hubs.is_empty() {
            METRICS.discovery_requests.with_label_values(&["degraded"]).inc();
            return self.stats_cache.get_any().unwrap_or_default();
        }

        let workflows: Vec<&RemoteWorkflow> = reachable.iter().flatten().collect();
        let average_reputation = if workflows.is_empty() {
            0.0
        } else {
            workflows.iter().map(|w| w.reputation_score).sum::<f64>() / workflows.len() as f64
        };

        let mut capability_counts: HashMap<&str, usize> = HashMap::new();
        for workflow in &workflows {
            for capability in &workflow.capabilities {
                *capability_counts.entry(capability.as_str()).or_insert(0) += 1;
            }
        }
        let mut top_capabilities: Vec<(String, usize)> = capability_counts
            .into_iter()
            .map(|(c, n)| (c.to_string(), n))
            .collect();
        top_capabilities.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_capabilities.truncate(10);

        let health_score = (reachable.len() as f64 * 0.1
            + workflows.len() as f64 * 0.05
            + average_reputation * 0.5)
            .min(1.0);

        let stats = NetworkStatistics {
            total_hubs: reachable.len(),
            total_workflows: workflows.len(),
            average_reputation,
            top_capabilities,
            health_score,
            updated_at: Utc::now(),
        };

        self.stats_cache.store(stats.clone());
        METRICS.discovery_requests.with_label_values(&["ok"]).inc();
        info!(
            "Network statistics refreshed: {} hubs, {} workflows",
            stats.total_hubs, stats.total_workflows
        );
        stats
    }

    /// Cache-only statistics accessor; never touches the network
    pub fn cached_statistics(&self) -> NetworkStatistics {
        self.stats_cache.get_any().unwrap_or_default()
    }

    async fn collect_hub_workflows(&self, hub_id: &str) -> Result<Vec<RemoteWorkflow>> {
        let filter = Self::discoverable_filter();
        let events = self.store.fetch_events(hub_id, &[filter]).await?;
        Ok(events
            .iter()
            .filter(|e| e.has_visibility(&[VIS_PUBLIC, VIS_DISCOVERABLE]))
            .map(|e| Self::convert_event(hub_id, e))
            .collect())
    }

    /// Fetch one filter from every registered hub, skipping failures
    async fn query_all_hubs(&self, filter: &EventFilter) -> Vec<RemoteWorkflow> {
        let mut results = Vec::new();

        for hub_id in self.registered_hubs() {
            match self.store.fetch_events(&hub_id, &[filter.clone()]).await {
                Ok(events) => {
                    results.extend(
                        events
                            .iter()
                            .filter(|e| e.has_visibility(&[VIS_PUBLIC, VIS_DISCOVERABLE]))
                            .map(|e| Self::convert_event(&hub_id, e)),
                    );
                }
                Err(e) => {
                    warn!("Hub {} query failed, degrading to empty: {}", hub_id, e);
                    METRICS.discovery_requests.with_label_values(&["degraded"]).inc();
                }
            }
        }

        METRICS.discovery_requests.with_label_values(&["ok"]).inc();
        results
    }
}

/// `|intersection| / max(|a|, |b|)`; 0 when either side is empty
fn overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.iter().filter(|x| b.contains(x)).count();
    intersection as f64 / a.len().max(b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::models::Tag;
    use crate::events::store::InMemoryEventStore;
    use rand::Rng;

    fn workflow(id: &str, reputation: f64, quality: f64, usage: u64) -> RemoteWorkflow {
        RemoteWorkflow {
            workflow_id: id.to_string(),
            hub_id: "hub-1".to_string(),
            owner_address: String::new(),
            name: id.to_string(),
            description: String::new(),
            capabilities: vec![],
            requirements: vec![],
            tags: vec![],
            performance: WorkflowMetrics {
                quality_score: quality,
                ..WorkflowMetrics::neutral()
            },
            reputation_score: reputation,
            is_public: true,
            usage_count: usage,
            created_at: None,
        }
    }

    async fn seeded_service() -> (Arc<InMemoryEventStore>, DiscoveryService) {
        let store = Arc::new(InMemoryEventStore::new());
        let service = DiscoveryService::new(store.clone(), DiscoveryConfig::default());
        service.register_hub("hub-1");
        (store, service)
    }

    async fn publish(
        store: &InMemoryEventStore,
        id: &str,
        capabilities: &[&str],
        visibility: &[&str],
        performance: Option<&str>,
    ) {
        let mut tags = vec![
            Tag::new(models::TAG_AI_TYPE, "workflow"),
            Tag::new(models::TAG_WORKFLOW_ID, id),
        ];
        for c in capabilities {
            tags.push(Tag::new(TAG_WORKFLOW_CAPABILITY, *c));
        }
        for v in visibility {
            tags.push(Tag::new(models::TAG_AI_TAG, *v));
        }
        if let Some(p) = performance {
            tags.push(Tag::new(TAG_WORKFLOW_PERFORMANCE, p));
        }
        store
            .publish_event("hub-1", tags, Some(format!("workflow {}", id)))
            .await
            .unwrap();
    }

    #[test]
    fn test_reputation_bounds_property() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let metrics = WorkflowMetrics {
                quality_score: rng.gen_range(-1.0..2.0),
                success_rate: rng.gen_range(-1.0..2.0),
                enhancement_count: rng.gen_range(0..5),
                ..WorkflowMetrics::neutral()
            };
            let access: u64 = rng.gen_range(0..10_000);
            let importance: f64 = rng.gen_range(-1.0..2.0);

            let reputation = DiscoveryService::compute_reputation(&metrics, access, importance);
            assert!((0.0..=1.0).contains(&reputation), "got {}", reputation);
        }
    }

    #[test]
    fn test_reputation_enhancement_signal() {
        let plain = WorkflowMetrics::neutral();
        let enhanced = WorkflowMetrics {
            enhancement_count: 3,
            ..WorkflowMetrics::neutral()
        };
        let a = DiscoveryService::compute_reputation(&plain, 0, 0.0);
        let b = DiscoveryService::compute_reputation(&enhanced, 0, 0.0);
        assert!((b - a - 0.15 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_reputation_dominates_past_gap() {
        let mut workflows = vec![
            workflow("low", 0.4, 1.0, 1_000),
            workflow("high", 0.9, 0.1, 0),
        ];
        DiscoveryService::rank_workflows(&mut workflows);
        assert_eq!(workflows[0].workflow_id, "high");
    }

    #[test]
    fn test_ranking_falls_through_to_quality_then_usage() {
        let mut workflows = vec![
            workflow("c", 0.80, 0.70, 5),
            workflow("b", 0.85, 0.70, 50),
            workflow("a", 0.82, 0.90, 1),
        ];
        DiscoveryService::rank_workflows(&mut workflows);
        // Reputations within 0.1: quality decides, then usage
        assert_eq!(workflows[0].workflow_id, "a");
        assert_eq!(workflows[1].workflow_id, "b");
        assert_eq!(workflows[2].workflow_id, "c");
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let mut workflows = vec![
            workflow("a", 0.9, 0.9, 10),
            workflow("b", 0.5, 0.5, 5),
            workflow("c", 0.2, 0.9, 50),
        ];
        DiscoveryService::rank_workflows(&mut workflows);
        let first: Vec<String> = workflows.iter().map(|w| w.workflow_id.clone()).collect();
        DiscoveryService::rank_workflows(&mut workflows);
        let second: Vec<String> = workflows.iter().map(|w| w.workflow_id.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_primary_capability_table() {
        assert_eq!(
            DiscoveryService::primary_capability("convert JSON to CSV"),
            "format-conversion"
        );
        assert_eq!(
            DiscoveryService::primary_capability("nightly automation runs"),
            "workflow-automation"
        );
        assert_eq!(
            DiscoveryService::primary_capability("something else entirely"),
            "data-processing"
        );
    }

    #[test]
    fn test_conversion_truncates_description() {
        let mut raw = HashMap::new();
        raw.insert("Id".to_string(), serde_json::json!("wf-1"));
        raw.insert("Content".to_string(), serde_json::json!("x".repeat(500)));
        let event = Event::from_raw(&raw).unwrap();

        let converted = DiscoveryService::convert_event("hub-1", &event);
        assert_eq!(converted.description.len(), 200);
    }

    #[test]
    fn test_conversion_carries_event_timestamp() {
        let mut raw = HashMap::new();
        raw.insert("Id".to_string(), serde_json::json!("wf-1"));
        raw.insert("Timestamp".to_string(), serde_json::json!(1_700_000_000_000_i64));
        let event = Event::from_raw(&raw).unwrap();

        let converted = DiscoveryService::convert_event("hub-1", &event);
        assert_eq!(
            converted.created_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn test_conversion_swallows_malformed_performance_json() {
        let mut raw = HashMap::new();
        raw.insert("Id".to_string(), serde_json::json!("wf-1"));
        raw.insert(
            TAG_WORKFLOW_PERFORMANCE.to_string(),
            serde_json::json!("{not valid json"),
        );
        let event = Event::from_raw(&raw).unwrap();

        let converted = DiscoveryService::convert_event("hub-1", &event);
        assert_eq!(converted.performance, WorkflowMetrics::neutral());
    }

    #[tokio::test]
    async fn test_capability_query_requires_discoverable() {
        let (store, service) = seeded_service().await;
        publish(
            &store,
            "wf-visible",
            &["format-conversion"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            None,
        )
        .await;
        publish(
            &store,
            "wf-hidden",
            &["format-conversion"],
            &[VIS_PUBLIC],
            None,
        )
        .await;

        let results = service.find_by_capability("format-conversion").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].workflow_id, "wf-visible");
    }

    #[tokio::test]
    async fn test_similarity_threshold() {
        let (store, service) = seeded_service().await;
        publish(
            &store,
            "wf-close",
            &["a", "b", "c"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            None,
        )
        .await;
        publish(
            &store,
            "wf-far",
            &["x", "y", "z"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            None,
        )
        .await;

        // Sharing 1 of 3 capabilities: overlap 0.33 >= 0.3
        let reference = vec!["a".to_string(), "q".to_string(), "r".to_string()];
        let similar = service.find_similar_workflows(&reference, &[]).await;
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].workflow_id, "wf-close");
    }

    #[tokio::test]
    async fn test_progressive_search_merges_and_ranks() {
        let (store, service) = seeded_service().await;
        publish(
            &store,
            "wf-broad",
            &["format-conversion"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            Some("{\"qualityScore\":0.9,\"successRate\":0.9}"),
        )
        .await;
        publish(
            &store,
            "wf-text",
            &["other"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            None,
        )
        .await;

        // "workflow" maps to the default capability, which matches no
        // broad results; the text pass finds both via content and the
        // union is ranked by reputation
        let results = service.find_workflows("workflow").await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].workflow_id, "wf-broad");
    }

    #[tokio::test]
    async fn test_hub_discovery_skips_unreachable() {
        let (store, service) = seeded_service().await;
        service.register_hub("hub-dead");
        publish(
            &store,
            "wf-1",
            &["a"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            Some("{\"qualityScore\":0.8}"),
        )
        .await;

        // hub-dead has no events; InMemory store treats it as empty (not an
        // error), so both hubs report, one with zero workflows
        let hubs = service.discover_hubs().await;
        assert_eq!(hubs.len(), 2);
        let hub1 = hubs.iter().find(|h| h.hub_id == "hub-1").unwrap();
        assert_eq!(hub1.workflow_count, 1);
        let expected = 0.7 * 0.8 + 0.3 * (1.0_f64 * 0.02).min(1.0);
        assert!((hub1.reputation - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_network_statistics_and_instant_accessor() {
        let (store, service) = seeded_service().await;
        publish(
            &store,
            "wf-1",
            &["format-conversion"],
            &[VIS_PUBLIC, VIS_DISCOVERABLE],
            None,
        )
        .await;

        let stats = service.network_statistics().await;
        assert_eq!(stats.total_hubs, 1);
        assert_eq!(stats.total_workflows, 1);
        assert!(stats.health_score > 0.0);

        let cached = service.cached_statistics();
        assert_eq!(cached.total_workflows, 1);
    }

    #[tokio::test]
    async fn test_statistics_default_when_nothing_known() {
        let store = Arc::new(InMemoryEventStore::new());
        let service = DiscoveryService::new(store, DiscoveryConfig::default());
        let stats = service.cached_statistics();
        assert_eq!(stats.total_hubs, 0);
        assert_eq!(stats.health_score, 0.0);
    }

    #[test]
    fn test_overlap_edges() {
        let a = vec!["x".to_string()];
        assert_eq!(overlap(&a, &[]), 0.0);
        assert_eq!(overlap(&a, &a.clone()), 1.0);
    }
}
