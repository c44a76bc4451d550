//! Ecosystem analytics
//!
//! Pure aggregation over the tracker, the relationship graph, and the
//! enhancement loops. No state of its own beyond the injected handles.

use super::models::{EcosystemHealth, WorkflowCategory};
use crate::enhancement::engine::EnhancementEngine;
use crate::performance::tracker::PerformanceTracker;
use crate::relationships::manager::RelationshipManager;
use std::sync::Arc;
use tracing::debug;

/// Keyword table for the ten taxonomic buckets
const CATEGORY_KEYWORDS: [(&str, &[&str]); 10] = [
    ("analysis", &["analysis", "analyze", "insight", "inspect", "report"]),
    ("automation", &["automation", "automate", "schedule", "trigger", "pipeline"]),
    ("communication", &["communication", "message", "notify", "email", "chat"]),
    ("coordination", &["coordination", "coordinate", "orchestrate", "delegate"]),
    ("creative", &["creative", "generate", "design", "compose", "write"]),
    ("data_processing", &["data", "transform", "parse", "convert", "etl"]),
    ("decision_making", &["decision", "decide", "evaluate", "select", "rank"]),
    ("monitoring", &["monitoring", "monitor", "observe", "alert", "watch"]),
    ("optimization", &["optimization", "optimize", "tune", "improve", "performance"]),
    ("problem_solving", &["problem", "solve", "debug", "diagnose", "resolve"]),
];

const CONTENT_WEIGHT: u32 = 2;
const CAPABILITY_WEIGHT: u32 = 3;
const REQUIREMENT_WEIGHT: u32 = 1;

const MAX_RECOMMENDATIONS: usize = 10;

pub struct AnalyticsService {
    tracker: Arc<PerformanceTracker>,
    relationships: Arc<RelationshipManager>,
    engine: Arc<EnhancementEngine>,
}

impl AnalyticsService {
    pub fn new(
        tracker: Arc<PerformanceTracker>,
        relationships: Arc<RelationshipManager>,
        engine: Arc<EnhancementEngine>,
    ) -> Self {
        Self {
            tracker,
            relationships,
            engine,
        }
    }

    /// Ecosystem health as the unweighted mean of seven sub-scores
    pub fn ecosystem_health(&self) -> EcosystemHealth {
        let mut applied_total = 0usize;
        let mut rejected_total = 0usize;
        let mut impact_sum = 0.0;
        let mut transferred = 0usize;
        let mut learning_rate_sum = 0.0;
        let mut retention_sum = 0.0;
        let mut loop_count = 0usize;

        for workflow_id in self.engine.workflow_ids() {
            let state = match self.engine.loop_state(&workflow_id) {
                Some(s) => s,
                None => continue,
            };
            loop_count += 1;
            applied_total += state.applied.len();
            rejected_total += state.rejected.len();
            impact_sum += state
                .applied
                .iter()
                .filter_map(|e| e.actual_impact)
                .sum::<f64>();
            transferred += state
                .applied
                .iter()
                .filter(|e| {
                    e.source == crate::enhancement::EnhancementSource::PeerLearning
                })
                .count();
            learning_rate_sum += (state.learning_model.learning_rate * 100.0).min(1.0);
            retention_sum +=
                (state.learning_model.training_data.len() as f64 / 100.0).min(1.0);
        }

        let processed = applied_total + rejected_total;
        let enhancement_success_rate = if processed > 0 {
            applied_total as f64 / processed as f64
        } else {
            0.0
        };
        let enhancement_avg_impact = if applied_total > 0 {
            (impact_sum / applied_total as f64).min(1.0)
        } else {
            0.0
        };
        let transfer_efficiency = if applied_total > 0 {
            transferred as f64 / applied_total as f64
        } else {
            0.0
        };
        let (knowledge_retention, normalized_learning_rate) = if loop_count > 0 {
            (
                retention_sum / loop_count as f64,
                learning_rate_sum / loop_count as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let graph_ids = self.relationships.all_workflow_ids();
        let (network_density, influence_score) = if graph_ids.is_empty() {
            (0.0, 0.0)
        } else {
            let mut connectivity = 0.0;
            let mut influence = 0.0;
            for id in &graph_ids {
                let metrics = self.relationships.calculate_network_metrics(id);
                connectivity += metrics.connectivity_score;
                influence += metrics.influence_score;
            }
            (
                connectivity / graph_ids.len() as f64,
                influence / graph_ids.len() as f64,
            )
        };

        let overall = (enhancement_success_rate
            + enhancement_avg_impact
            + network_density
            + influence_score
            + knowledge_retention
            + transfer_efficiency
            + normalized_learning_rate)
            / 7.0;

        debug!("Ecosystem health computed: {:.3}", overall);

        EcosystemHealth {
            enhancement_success_rate,
            enhancement_avg_impact,
            network_density,
            influence_score,
            knowledge_retention,
            transfer_efficiency,
            normalized_learning_rate,
            overall,
        }
    }

    /// Bucket a workflow by weighted keyword scoring
    ///
    /// Content matches weigh 2, capability matches 3, requirement
    /// matches 1. A unique top score picks the bucket; ties and an
    /// all-zero score fall back to uncategorized.
    pub fn categorize_workflow(
        &self,
        content: &str,
        capabilities: &[String],
        requirements: &[String],
    ) -> WorkflowCategory {
        let content = content.to_lowercase();
        let capabilities: Vec<String> =
            capabilities.iter().map(|c| c.to_lowercase()).collect();
        let requirements: Vec<String> =
            requirements.iter().map(|r| r.to_lowercase()).collect();

        let mut scores: Vec<(WorkflowCategory, u32)> = Vec::with_capacity(10);
        for (bucket, keywords) in CATEGORY_KEYWORDS {
            let mut score = 0u32;
            for keyword in keywords {
                if content.contains(keyword) {
                    score += CONTENT_WEIGHT;
                }
                if capabilities.iter().any(|c| c.contains(keyword)) {
                    score += CAPABILITY_WEIGHT;
                }
                if requirements.iter().any(|r| r.contains(keyword)) {
                    score += REQUIREMENT_WEIGHT;
                }
            }
            scores.push((WorkflowCategory(bucket.to_string()), score));
        }

        let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if best == 0 {
            return WorkflowCategory::uncategorized();
        }
        let mut winners = scores.into_iter().filter(|(_, s)| *s == best);
        let winner = winners.next().map(|(c, _)| c);
        if winners.next().is_some() {
            return WorkflowCategory::uncategorized();
        }
        winner.unwrap_or_else(WorkflowCategory::uncategorized)
    }

    /// Threshold-driven free-text recommendations, capped at ten
    pub fn generate_recommendations(&self) -> Vec<String> {
        let health = self.ecosystem_health();
        let mut recommendations = Vec::new();

        if health.enhancement_success_rate < 0.6 {
            recommendations.push(
                "Enhancement success rate is below 60%; tighten validation before applying"
                    .to_string(),
            );
        }
        if health.enhancement_avg_impact < 0.1 {
            recommendations.push(
                "Applied enhancements have low measured impact; prefer higher-impact candidates"
                    .to_string(),
            );
        }
        if health.network_density < 0.2 {
            recommendations.push(
                "The relationship graph is sparse; link related workflows to enable peer learning"
                    .to_string(),
            );
        }
        if health.influence_score < 0.2 {
            recommendations.push(
                "Few workflows influence others; consider publishing reusable enhancements"
                    .to_string(),
            );
        }
        if health.knowledge_retention < 0.3 {
            recommendations.push(
                "Learning models have little training data; run more enhancement cycles"
                    .to_string(),
            );
        }
        if health.transfer_efficiency < 0.1 {
            recommendations.push(
                "Peer-learned enhancements rarely land; review relationship strengths".to_string(),
            );
        }
        if health.overall < 0.5 {
            recommendations
                .push("Overall ecosystem health is below 0.5; review the weakest sub-scores"
                    .to_string());
        }

        for workflow_id in self.engine.workflow_ids() {
            if recommendations.len() >= MAX_RECOMMENDATIONS {
                break;
            }
            let stats = self.tracker.get_performance_stats(&workflow_id);
            if let Some(average) = stats.average {
                if average.success_rate < 0.6 {
                    recommendations.push(format!(
                        "Workflow {} succeeds less than 60% of the time; prioritize bug fixes",
                        workflow_id
                    ));
                }
            }
        }

        recommendations.truncate(MAX_RECOMMENDATIONS);
        recommendations
    }
}
