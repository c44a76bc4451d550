//! Self-enhancement engine
//!
//! Runs the five-phase cycle per workflow: identify candidates from
//! performance data, peers, the relationship graph, and analytics;
//! validate them; apply the survivors lowest-risk first; feed outcomes
//! into the learning model; and hand back a delay hint for the next
//! cycle. One failing candidate never aborts the batch, and a workflow
//! without an initialized loop gets an idle report, not an error.

use super::models::*;
use crate::config::EnhancementConfig;
use crate::events::publisher::EventPublisher;
use crate::metrics::METRICS;
use crate::performance::tracker::PerformanceTracker;
use crate::relationships::manager::RelationshipManager;
use crate::relationships::models::OpportunityKind;
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cycle delay hints in milliseconds
const CYCLE_FAST_MS: u64 = 3_600_000;
const CYCLE_MODERATE_MS: u64 = 14_400_000;
const CYCLE_SLOW_MS: u64 = 86_400_000;

/// Orchestrates the enhancement lifecycle for every initialized workflow
pub struct EnhancementEngine {
    config: EnhancementConfig,
    tracker: Arc<PerformanceTracker>,
    relationships: Arc<RelationshipManager>,
    /// Remote peer-pattern source; peer learning degrades to local-only
    /// when absent
    publisher: Option<Arc<EventPublisher>>,
    home_hub: Option<String>,
    loops: DashMap<String, EnhancementLoop>,
    /// Enhancements queued from feedback/errors, merged at the next cycle
    pending: DashMap<String, Vec<Enhancement>>,
}

impl EnhancementEngine {
    pub fn new(
        config: EnhancementConfig,
        tracker: Arc<PerformanceTracker>,
        relationships: Arc<RelationshipManager>,
    ) -> Self {
        Self {
            config,
            tracker,
            relationships,
            publisher: None,
            home_hub: None,
            loops: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    /// Enable remote peer-pattern fetching against one hub
    pub fn with_peer_source(mut self, publisher: Arc<EventPublisher>, hub_id: &str) -> Self {
        self.publisher = Some(publisher);
        self.home_hub = Some(hub_id.to_string());
        self
    }

    /// One-time loop setup for a workflow
    pub fn initialize_enhancement_loop(&self, workflow_id: &str, optimization_targets: Vec<String>) {
        self.loops
            .entry(workflow_id.to_string())
            .or_insert_with(|| {
                info!("Initialized enhancement loop for {}", workflow_id);
                EnhancementLoop::new(workflow_id.to_string(), optimization_targets)
            });
    }

    pub fn has_loop(&self, workflow_id: &str) -> bool {
        self.loops.contains_key(workflow_id)
    }

    /// Workflows with an initialized loop
    pub fn workflow_ids(&self) -> Vec<String> {
        self.loops.iter().map(|l| l.key().clone()).collect()
    }

    /// Loop state snapshot, if initialized
    pub fn loop_state(&self, workflow_id: &str) -> Option<EnhancementLoop> {
        self.loops.get(workflow_id).map(|l| l.clone())
    }

    /// Run one full enhancement cycle
    ///
    /// Phases execute strictly in order. Callers are responsible for
    /// serializing concurrent cycles for the same workflow ID.
    pub async fn run_enhancement_cycle(&self, workflow_id: &str) -> CycleReport {
        if workflow_id.trim().is_empty() || !self.loops.contains_key(workflow_id) {
            debug!("No enhancement loop for '{}'; idle cycle", workflow_id);
            return CycleReport::idle();
        }

        METRICS.enhancement_cycles.inc();

        // Phase 1: identify
        let identified = self.identify(workflow_id).await;

        // Phase 2: validate
        let mut validated: Vec<Enhancement> = identified
            .iter()
            .cloned()
            .map(|mut enhancement| {
                let battery = Self::validation_battery(&enhancement);
                enhancement.validation = Some(self.tracker.validate_enhancement(
                    workflow_id,
                    &enhancement,
                    battery,
                ));
                enhancement
            })
            .collect();

        // Phase 3: apply, lowest risk first, highest impact within a tier
        validated.sort_by(|a, b| {
            let risk_a = a
                .validation
                .as_ref()
                .map(|v| v.risk_assessment)
                .unwrap_or(RiskLevel::Critical);
            let risk_b = b
                .validation
                .as_ref()
                .map(|v| v.risk_assessment)
                .unwrap_or(RiskLevel::Critical);
            risk_a
                .cmp(&risk_b)
                .then_with(|| b.impact.partial_cmp(&a.impact).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        for mut enhancement in validated {
            if enhancement.is_applicable(self.config.apply_confidence) {
                let validation = enhancement.validation.as_ref().unwrap();
                let actual = enhancement.impact
                    * validation.confidence
                    * validation.risk_assessment.impact_multiplier();
                enhancement.actual_impact = Some(actual);
                self.tracker.track_enhancement(workflow_id, enhancement.clone());
                METRICS.enhancements_applied.inc();
                applied.push(enhancement);
            } else {
                enhancement.actual_impact = Some(0.0);
                METRICS.enhancements_rejected.inc();
                rejected.push(enhancement);
            }
        }

        // Phase 4: learn
        if let Some(mut state) = self.loops.get_mut(workflow_id) {
            // Split field borrows on the struct, not the map guard
            let state = &mut *state;
            if !applied.is_empty() {
                state.current_version += 1;
            }

            let snapshot = self.tracker.calculate_health_score(workflow_id);
            for enhancement in applied.iter().chain(rejected.iter()) {
                let actual = enhancement.actual_impact.unwrap_or(0.0);
                state.learning_model.training_data.push(TrainingDataPoint {
                    enhancement_type: enhancement.enhancement_type,
                    predicted_impact: enhancement.impact,
                    actual_impact: actual,
                    success: actual > 0.0,
                    performance_snapshot: snapshot,
                    recorded_at: Utc::now(),
                });
            }

            let cap = self.config.training_cap;
            if state.learning_model.training_data.len() > cap {
                let excess = state.learning_model.training_data.len() - cap;
                state.learning_model.training_data.drain(..excess);
            }

            state.learning_model.accuracy = Self::model_accuracy(&state.learning_model);
            state.learning_model.last_updated = Utc::now();

            state.applied.extend(applied.iter().cloned());
            state.rejected.extend(rejected.iter().cloned());
            for history in [&mut state.applied, &mut state.rejected] {
                if history.len() > self.config.history_cap {
                    let excess = history.len() - self.config.history_cap;
                    history.drain(..excess);
                }
            }
        }

        // Phase 5: schedule hint from recent applied impact
        let next_cycle_in = self.schedule_hint(workflow_id);

        info!(
            "Cycle for {}: {} identified, {} applied, {} rejected, next in {}ms",
            workflow_id,
            identified.len(),
            applied.len(),
            rejected.len(),
            next_cycle_in
        );

        CycleReport {
            enhancements: identified,
            applied,
            rejected,
            next_cycle_in,
        }
    }

    async fn identify(&self, workflow_id: &str) -> Vec<Enhancement> {
        let mut candidates = Vec::new();

        // Performance-driven detectors
        candidates.extend(self.tracker.identify_enhancements(workflow_id));

        // Queued feedback/error enhancements
        if let Some((_, queued)) = self.pending.remove(workflow_id) {
            candidates.extend(queued);
        }

        // Peer learning: adapted copies of related workflows' applied
        // enhancements, discounted and stripped of validation
        candidates.extend(self.peer_candidates(workflow_id).await);

        // Emergent proposals from the relationship graph
        for opportunity in self.relationships.find_collaboration_opportunities(workflow_id) {
            let (enhancement_type, impact) = match opportunity.kind {
                OpportunityKind::Composition => (EnhancementType::FeatureAdd, 0.4),
                _ => (EnhancementType::LogicImprove, 0.25),
            };
            let mut enhancement = Enhancement::new(
                enhancement_type,
                format!(
                    "Collaborate with {}: {}",
                    opportunity.workflow_id, opportunity.reason
                ),
                impact,
                EnhancementSource::Emergent,
            );
            enhancement.parameters = Some(serde_json::json!({
                "partner": opportunity.workflow_id,
            }));
            candidates.push(enhancement);
        }

        // Analytics-derived: report impact split evenly across its
        // recommendations
        let report = self.tracker.generate_optimization_recommendations(workflow_id);
        if !report.recommendations.is_empty() {
            let share = report.expected_impact / report.recommendations.len() as f64;
            for recommendation in report.recommendations {
                candidates.push(Enhancement::new(
                    EnhancementType::Optimization,
                    recommendation,
                    share,
                    EnhancementSource::Analytics,
                ));
            }
        }

        // The sources overlap; keep the first candidate per description
        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.description.clone()));

        for candidate in &candidates {
            METRICS
                .enhancements_identified
                .with_label_values(&[source_label(candidate.source)])
                .inc();
        }

        candidates
    }

    /// Applied enhancements of related workflows, adapted for this one
    ///
    /// Strong ties always contribute; weak ties contribute only on an
    /// exploration-rate draw. Remote pattern fetches degrade to nothing
    /// on failure.
    async fn peer_candidates(&self, workflow_id: &str) -> Vec<Enhancement> {
        let exploration_rate = self
            .loops
            .get(workflow_id)
            .map(|l| l.learning_model.exploration_rate)
            .unwrap_or(0.1);
        let explore = rand::thread_rng().gen_bool(exploration_rate.clamp(0.0, 1.0));

        let related: Vec<String> = self
            .relationships
            .get_relationships(workflow_id)
            .into_iter()
            .filter(|link| link.strength >= 0.5 || explore)
            .map(|link| link.target_id)
            .collect();

        let already_applied: HashSet<String> = self
            .loops
            .get(workflow_id)
            .map(|l| l.applied.iter().map(|e| e.description.clone()).collect())
            .unwrap_or_default();

        let mut peers = Vec::new();

        for peer_id in &related {
            let local: Vec<Enhancement> = self
                .loops
                .get(peer_id)
                .map(|l| l.applied.clone())
                .unwrap_or_default();
            peers.extend(local);

            if let (Some(publisher), Some(hub)) = (&self.publisher, &self.home_hub) {
                match publisher.fetch_enhancement_patterns(hub, peer_id).await {
                    Ok(remote) => peers.extend(remote),
                    Err(e) => {
                        warn!("Peer pattern fetch for {} failed: {}", peer_id, e);
                    }
                }
            }
        }

        peers
            .into_iter()
            .filter(|e| !already_applied.contains(&e.description))
            .map(|peer| {
                let mut adapted = Enhancement::new(
                    peer.enhancement_type,
                    peer.description,
                    peer.impact * self.config.peer_discount,
                    EnhancementSource::PeerLearning,
                );
                adapted.code = peer.code;
                adapted.parameters = peer.parameters;
                // Validation does not transfer across workflows
                adapted.validation = None;
                adapted
            })
            .collect()
    }

    /// Lightweight validation battery run before the tracker's verdict
    fn validation_battery(enhancement: &Enhancement) -> Vec<TestResult> {
        vec![
            TestResult::new("syntax-check", true, 1.0),
            TestResult::new(
                "impact-validation",
                true,
                (enhancement.impact * 2.0).min(1.0),
            ),
        ]
    }

    /// Accuracy over the last 100 points: prediction (impact > 0.2) must
    /// match the observed success
    fn model_accuracy(model: &LearningModel) -> f64 {
        let data = &model.training_data;
        if data.is_empty() {
            return model.accuracy;
        }
        let window = &data[data.len().saturating_sub(100)..];
        let correct = window
            .iter()
            .filter(|p| (p.predicted_impact > 0.2) == p.success)
            .count();
        correct as f64 / window.len() as f64
    }

    fn schedule_hint(&self, workflow_id: &str) -> u64 {
        let recent_mean = self
            .loops
            .get(workflow_id)
            .map(|state| {
                let applied = &state.applied;
                let window = &applied[applied.len().saturating_sub(10)..];
                if window.is_empty() {
                    0.0
                } else {
                    window
                        .iter()
                        .filter_map(|e| e.actual_impact)
                        .sum::<f64>()
                        / window.len() as f64
                }
            })
            .unwrap_or(0.0);

        if recent_mean > 0.3 {
            CYCLE_FAST_MS
        } else if recent_mean > 0.1 {
            CYCLE_MODERATE_MS
        } else {
            CYCLE_SLOW_MS
        }
    }

    /// Turn free-text user feedback into queued enhancements
    ///
    /// Naive keyword extraction: "slow" flags performance, "error"/"fail"
    /// reliability, "confus" usability. Each detected issue queues one
    /// fixed-impact enhancement for the next cycle.
    pub fn process_user_feedback(
        &self,
        workflow_id: &str,
        feedback: &str,
        rating: f64,
        context: Option<&str>,
    ) -> Vec<Enhancement> {
        let lowered = feedback.to_lowercase();
        let mut issues = Vec::new();
        let mut enhancements = Vec::new();

        let checks: [(&str, &str, EnhancementType); 3] = [
            ("slow", "performance", EnhancementType::Optimization),
            ("error", "reliability", EnhancementType::ErrorHandling),
            ("confus", "usability", EnhancementType::UserExperience),
        ];
        for (keyword, issue, enhancement_type) in checks {
            if lowered.contains(keyword) {
                issues.push(issue.to_string());
                enhancements.push(Enhancement::new(
                    enhancement_type,
                    format!("Address {} issue reported by user feedback", issue),
                    0.3,
                    EnhancementSource::UserFeedback,
                ));
            }
        }
        // "fail" also signals reliability when "error" did not
        if lowered.contains("fail") && !issues.iter().any(|i| i == "reliability") {
            issues.push("reliability".to_string());
            enhancements.push(Enhancement::new(
                EnhancementType::ErrorHandling,
                "Address reliability issue reported by user feedback",
                0.3,
                EnhancementSource::UserFeedback,
            ));
        }

        let priority = if rating < 3.0 {
            Priority::High
        } else if rating < 4.0 {
            Priority::Medium
        } else {
            Priority::Low
        };

        if let Some(mut state) = self.loops.get_mut(workflow_id) {
            state.feedback.push(FeedbackEntry {
                feedback: feedback.to_string(),
                rating,
                context: context.map(str::to_string),
                detected_issues: issues,
                priority,
                recorded_at: Utc::now(),
            });
        }

        if !enhancements.is_empty() {
            self.pending
                .entry(workflow_id.to_string())
                .or_default()
                .extend(enhancements.clone());
        }

        enhancements
    }

    /// Turn an execution error into a queued bug-fix enhancement
    ///
    /// Impact is estimated from the error text: panics read critical,
    /// timeouts and network failures successively less so.
    pub fn create_enhancement_from_error(
        &self,
        workflow_id: &str,
        error: &str,
        context: &str,
    ) -> Enhancement {
        let lowered = error.to_lowercase();
        let (category, impact) = if lowered.contains("panic") || lowered.contains("unwrap") {
            ("critical", 0.8)
        } else if lowered.contains("timeout") || lowered.contains("timed out") {
            ("timeout", 0.6)
        } else if lowered.contains("network") || lowered.contains("connection") {
            ("network", 0.4)
        } else {
            ("unknown", 0.3)
        };

        let mut enhancement = Enhancement::new(
            EnhancementType::BugFix,
            format!("Fix {} error observed in {}: {}", category, context, error),
            impact,
            EnhancementSource::ErrorReport,
        );
        enhancement.code = Some(format!(
            "// TODO: guard against {} failure path seen in {}",
            category, context
        ));

        self.pending
            .entry(workflow_id.to_string())
            .or_default()
            .push(enhancement.clone());

        enhancement
    }
}

fn source_label(source: EnhancementSource) -> &'static str {
    match source {
        EnhancementSource::Performance => "performance",
        EnhancementSource::PeerLearning => "peer",
        EnhancementSource::Emergent => "emergent",
        EnhancementSource::Analytics => "analytics",
        EnhancementSource::UserFeedback => "feedback",
        EnhancementSource::ErrorReport => "error",
    }
}
