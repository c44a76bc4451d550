//! Workflow relationship graph
//!
//! One edge-list store holds every typed link; the dependency subgraph
//! and inheritance chains are derived views computed on read, so the
//! three structures can never drift apart.

use super::models::*;
use crate::enhancement::models::{Enhancement, EnhancementType, RiskLevel};
use crate::metrics::METRICS;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Fixed table of relationship-type pairs judged complementary: a
/// workflow holding an edge of the left type pairs well with one holding
/// the right.
const COMPLEMENTARY_PAIRS: [(RelationshipType, RelationshipType); 3] = [
    (RelationshipType::Enhances, RelationshipType::Extends),
    (RelationshipType::Supports, RelationshipType::DependsOn),
    (RelationshipType::Triggers, RelationshipType::Causes),
];

/// Producer-side semantic types for the producer/consumer heuristic
const PRODUCER_TYPES: [RelationshipType; 3] = [
    RelationshipType::Enhances,
    RelationshipType::Supports,
    RelationshipType::Triggers,
];

/// Consumer-side types for the producer/consumer heuristic
const CONSUMER_TYPES: [RelationshipType; 2] =
    [RelationshipType::DependsOn, RelationshipType::References];

/// Maintains the directed, typed, weighted inter-workflow graph
pub struct RelationshipManager {
    edges: DashMap<String, Vec<RelationshipLink>>,
    compositions: DashMap<String, Composition>,
    /// Enhancements recorded by immediate propagation, per descendant
    propagated: DashMap<String, Vec<Enhancement>>,
}

impl RelationshipManager {
    pub fn new() -> Self {
        Self {
            edges: DashMap::new(),
            compositions: DashMap::new(),
            propagated: DashMap::new(),
        }
    }

    /// Create or replace a relationship edge
    ///
    /// Strength clamps into [0, 1]. An existing edge with the same
    /// (target, type) is replaced, never accumulated.
    pub fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
        strength: f64,
        metadata: HashMap<String, String>,
    ) {
        let link = RelationshipLink {
            relationship_type,
            target_id: target_id.to_string(),
            strength: strength.clamp(0.0, 1.0),
            metadata,
            created_at: Utc::now(),
        };

        {
            let mut outgoing = self.edges.entry(source_id.to_string()).or_default();
            outgoing.retain(|l| {
                !(l.target_id == target_id && l.relationship_type == relationship_type)
            });
            outgoing.push(link);
        }
        // Known even before it has outgoing edges of its own
        self.edges.entry(target_id.to_string()).or_default();

        METRICS.relationships_created.inc();
        debug!(
            "Relationship {:?}: {} -> {} (strength {:.2})",
            relationship_type,
            source_id,
            target_id,
            strength.clamp(0.0, 1.0)
        );
    }

    /// Outgoing links of a workflow
    pub fn get_relationships(&self, workflow_id: &str) -> Vec<RelationshipLink> {
        self.edges
            .get(workflow_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// All workflow IDs known to the graph
    pub fn all_workflow_ids(&self) -> Vec<String> {
        self.edges.iter().map(|e| e.key().clone()).collect()
    }

    /// Structural (composes / depends_on / inherits) targets of a workflow
    ///
    /// Derived view over the edge store; this is the dependency subgraph.
    fn dependency_targets(&self, workflow_id: &str) -> Vec<String> {
        self.edges
            .get(workflow_id)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|l| l.relationship_type.is_structural())
                    .map(|l| l.target_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// DFS cycle detection over the dependency subgraph only
    pub fn has_circular_dependency(&self, workflow_id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        self.dfs_cycle(workflow_id, &mut visited, &mut stack)
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
    ) -> bool {
        if stack.contains(node) {
            return true;
        }
        if !visited.insert(node.to_string()) {
            return false;
        }
        stack.insert(node.to_string());

        for target in self.dependency_targets(node) {
            if self.dfs_cycle(&target, visited, stack) {
                return true;
            }
        }

        stack.remove(node);
        false
    }

    /// Whether `to` is reachable from `from` over structural edges
    fn reachable(&self, from: &str, to: &str) -> bool {
        let mut visited = HashSet::new();
        let mut frontier = vec![from.to_string()];
        while let Some(node) = frontier.pop() {
            if node == to {
                return true;
            }
            if visited.insert(node.clone()) {
                frontier.extend(self.dependency_targets(&node));
            }
        }
        false
    }

    /// Workflows holding a structural edge to the target
    pub fn get_dependent_workflows(&self, workflow_id: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|entry| {
                entry.value().iter().any(|l| {
                    l.relationship_type.is_structural() && l.target_id == workflow_id
                })
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Inheritance chain `[workflow, parent, grandparent, ...]`
    ///
    /// Derived on read by following `inherits` edges; cycles terminate
    /// the walk.
    pub fn get_inheritance_chain(&self, workflow_id: &str) -> Vec<String> {
        let mut chain = vec![workflow_id.to_string()];
        let mut seen: HashSet<String> = chain.iter().cloned().collect();
        let mut current = workflow_id.to_string();

        loop {
            let parent = self.edges.get(&current).and_then(|edges| {
                edges
                    .iter()
                    .find(|l| l.relationship_type == RelationshipType::Inherits)
                    .map(|l| l.target_id.clone())
            });

            match parent {
                Some(parent) if seen.insert(parent.clone()) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                _ => break,
            }
        }

        chain
    }

    /// Graph-position metrics for one workflow
    pub fn calculate_network_metrics(&self, workflow_id: &str) -> NetworkMetrics {
        let all = self.all_workflow_ids();
        if all.is_empty() {
            return NetworkMetrics::default();
        }

        let outgoing = self.get_relationships(workflow_id);
        let out_degree = outgoing.len();
        let in_degree = self
            .edges
            .iter()
            .flat_map(|e| e.value().clone())
            .filter(|l| l.target_id == workflow_id)
            .count();

        let n = all.len() as f64;
        let connectivity_score = ((out_degree + in_degree) as f64 / (2.0 * n)).min(1.0);
        let influence_score = in_degree as f64 / n;
        let dependency_score = if out_degree == 0 {
            0.0
        } else {
            outgoing
                .iter()
                .filter(|l| {
                    matches!(
                        l.relationship_type,
                        RelationshipType::DependsOn | RelationshipType::Inherits
                    )
                })
                .count() as f64
                / out_degree as f64
        };

        let collaboration_potential = if all.len() > 1 {
            self.find_collaboration_opportunities(workflow_id).len() as f64 / (n - 1.0)
        } else {
            0.0
        };

        NetworkMetrics {
            connectivity_score,
            influence_score,
            dependency_score,
            collaboration_potential,
        }
    }

    /// Heuristic collaboration candidates among all other known workflows
    pub fn find_collaboration_opportunities(
        &self,
        workflow_id: &str,
    ) -> Vec<CollaborationOpportunity> {
        let own = self.get_relationships(workflow_id);
        let own_targets: HashSet<&str> = own.iter().map(|l| l.target_id.as_str()).collect();

        // Snapshot the graph up front so no shard guard is held while
        // reachable() walks the map
        let others: Vec<(String, Vec<RelationshipLink>)> = self
            .edges
            .iter()
            .filter(|e| e.key() != workflow_id)
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut opportunities = Vec::new();

        for (other_id, other) in &others {
            let other_targets: HashSet<&str> =
                other.iter().map(|l| l.target_id.as_str()).collect();

            if own_targets.intersection(&other_targets).next().is_some() {
                opportunities.push(CollaborationOpportunity {
                    workflow_id: other_id.clone(),
                    kind: OpportunityKind::SharedTargets,
                    reason: "Both workflows act on shared targets".to_string(),
                });
            }

            if Self::complementary(&own, other) {
                opportunities.push(CollaborationOpportunity {
                    workflow_id: other_id.clone(),
                    kind: OpportunityKind::ComplementaryCapabilities,
                    reason: "Relationship patterns suggest complementary roles".to_string(),
                });
            }

            // Compositions need no direct edge and no cycle either way
            let directly_linked = own_targets.contains(other_id.as_str())
                || other_targets.contains(workflow_id);
            if !directly_linked
                && !self.reachable(workflow_id, other_id)
                && !self.reachable(other_id, workflow_id)
            {
                opportunities.push(CollaborationOpportunity {
                    workflow_id: other_id.clone(),
                    kind: OpportunityKind::Composition,
                    reason: "Unrelated and acyclic; safe to compose".to_string(),
                });
            }
        }

        opportunities
    }

    fn complementary(own: &[RelationshipLink], other: &[RelationshipLink]) -> bool {
        let types = |links: &[RelationshipLink]| -> HashSet<RelationshipType> {
            links.iter().map(|l| l.relationship_type).collect()
        };
        let own_types = types(own);
        let other_types = types(other);

        let produces = |types: &HashSet<RelationshipType>| {
            PRODUCER_TYPES.iter().any(|t| types.contains(t))
        };
        let consumes = |types: &HashSet<RelationshipType>| {
            CONSUMER_TYPES.iter().any(|t| types.contains(t))
        };

        // Producer/consumer pairing in either direction
        if (produces(&own_types) && consumes(&other_types))
            || (produces(&other_types) && consumes(&own_types))
        {
            return true;
        }

        // One side requires what the other side provides
        let meta = |links: &[RelationshipLink], key: &str| -> HashSet<String> {
            links
                .iter()
                .filter_map(|l| l.metadata.get(key).cloned())
                .collect()
        };
        let own_needs = meta(own, "requirement");
        let other_offers = meta(other, "capability");
        if own_needs.intersection(&other_offers).next().is_some() {
            return true;
        }
        let other_needs = meta(other, "requirement");
        let own_offers = meta(own, "capability");
        if other_needs.intersection(&own_offers).next().is_some() {
            return true;
        }

        COMPLEMENTARY_PAIRS.iter().any(|(a, b)| {
            (own_types.contains(a) && other_types.contains(b))
                || (own_types.contains(b) && other_types.contains(a))
        })
    }

    /// Create a named composition and its `composes` edges
    #[allow(clippy::too_many_arguments)]
    pub fn create_composition(
        &self,
        name: &str,
        description: &str,
        members: Vec<CompositionMember>,
        execution_strategy: ExecutionStrategy,
        error_handling: ErrorHandlingPolicy,
        resource_allocation: ResourceAllocation,
    ) -> Composition {
        let composition = Composition {
            id: format!("comp-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            description: description.to_string(),
            members,
            execution_strategy,
            error_handling,
            resource_allocation,
            created_at: Utc::now(),
        };

        for member in &composition.members {
            self.create_relationship(
                &composition.id,
                &member.workflow_id,
                RelationshipType::Composes,
                1.0,
                HashMap::new(),
            );
        }

        info!(
            "Created composition {} ({} members)",
            composition.id,
            composition.members.len()
        );
        self.compositions
            .insert(composition.id.clone(), composition.clone());
        composition
    }

    pub fn get_composition(&self, composition_id: &str) -> Option<Composition> {
        self.compositions.get(composition_id).map(|c| c.clone())
    }

    /// Adjust edge strengths against observed partner performance
    ///
    /// Strengthens toward strong targets, weakens toward weak ones,
    /// removes edges that decay below the floor, and suggests links to
    /// strong workflows not yet connected. Suggestions are returned, not
    /// auto-created.
    pub fn optimize_relationships(
        &self,
        workflow_id: &str,
        performance_data: &HashMap<String, f64>,
    ) -> RelationshipOptimization {
        let mut outcome = RelationshipOptimization::default();

        if let Some(mut edges) = self.edges.get_mut(workflow_id) {
            for link in edges.iter_mut() {
                let Some(&score) = performance_data.get(&link.target_id) else {
                    continue;
                };

                if score > 0.8 && link.strength < 0.9 {
                    link.strength = (link.strength + 0.1).min(1.0);
                    outcome
                        .strengthened
                        .push((link.target_id.clone(), link.strength));
                } else if score < 0.3 && link.strength > 0.1 {
                    link.strength = (link.strength - 0.2).max(0.1);
                    outcome
                        .weakened
                        .push((link.target_id.clone(), link.strength));
                }
            }

            let before = edges.len();
            edges.retain(|link| {
                if link.strength < 0.05 {
                    outcome.removed.push(link.target_id.clone());
                    false
                } else {
                    true
                }
            });
            if edges.len() < before {
                debug!(
                    "Removed {} decayed edges from {}",
                    before - edges.len(),
                    workflow_id
                );
            }
        }

        let linked: HashSet<String> = self
            .get_relationships(workflow_id)
            .into_iter()
            .map(|l| l.target_id)
            .collect();
        for (candidate, &score) in performance_data {
            if candidate != workflow_id && score > 0.8 && !linked.contains(candidate) {
                outcome.suggested.push(candidate.clone());
            }
        }

        outcome
    }

    /// Push a validated enhancement down inheritance chains
    ///
    /// Descendants are workflows whose inheritance chain includes the
    /// source. High-risk enhancements never propagate; bug fixes need
    /// impact ≥0.2; everything else needs impact >0.1.
    pub fn propagate_enhancement(
        &self,
        source_id: &str,
        enhancement: &Enhancement,
        strategy: PropagationStrategy,
    ) -> PropagationResult {
        let descendants: Vec<String> = self
            .all_workflow_ids()
            .into_iter()
            .filter(|id| {
                id != source_id
                    && self
                        .get_inheritance_chain(id)
                        .iter()
                        .any(|a| a == source_id)
            })
            .collect();

        let mut result = PropagationResult::default();

        if !Self::should_propagate(enhancement) {
            result.skipped = descendants;
            return result;
        }

        for descendant in descendants {
            if strategy == PropagationStrategy::Immediate {
                // Extension point: record the inherited enhancement; real
                // application is the embedder's concern
                self.propagated
                    .entry(descendant.clone())
                    .or_default()
                    .push(enhancement.clone());
                info!(
                    "Applied inherited enhancement {} to {}",
                    enhancement.id, descendant
                );
            }
            result.propagated_to.push(descendant);
        }

        METRICS.propagations.inc();
        result
    }

    fn should_propagate(enhancement: &Enhancement) -> bool {
        if let Some(validation) = &enhancement.validation {
            if validation.risk_assessment == RiskLevel::High
                || validation.risk_assessment == RiskLevel::Critical
            {
                return false;
            }
        }
        if enhancement.enhancement_type == EnhancementType::BugFix && enhancement.impact < 0.2 {
            return false;
        }
        enhancement.impact > 0.1
    }

    /// Enhancements recorded by immediate propagation against a workflow
    pub fn propagated_enhancements(&self, workflow_id: &str) -> Vec<Enhancement> {
        self.propagated
            .get(workflow_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Aggregate view of the whole graph
    pub fn get_ecosystem_overview(&self) -> EcosystemOverview {
        let all = self.all_workflow_ids();
        let total_relationships: usize = self.edges.iter().map(|e| e.value().len()).sum();

        let mut average_connectivity = 0.0;
        let mut circular = Vec::new();
        let mut isolated = Vec::new();
        let mut hubs = Vec::new();

        for id in &all {
            let metrics = self.calculate_network_metrics(id);
            average_connectivity += metrics.connectivity_score;

            if self.has_circular_dependency(id) {
                circular.push(id.clone());
            }
            if metrics.connectivity_score == 0.0 {
                isolated.push(id.clone());
            }
            if metrics.connectivity_score > 0.7 && metrics.influence_score > 0.5 {
                hubs.push(id.clone());
            }
        }

        if !all.is_empty() {
            average_connectivity /= all.len() as f64;
        }

        EcosystemOverview {
            total_workflows: all.len(),
            total_relationships,
            average_connectivity,
            circular_workflows: circular,
            isolated_workflows: isolated,
            hub_workflows: hubs,
        }
    }
}

impl Default for RelationshipManager {
    fn default() -> Self {
        Self::new()
    }
}
