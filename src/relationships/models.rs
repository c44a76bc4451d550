//! Data models for the workflow relationship graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Typed relationship between workflows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    // Structural
    Composes,
    DependsOn,
    Inherits,
    // Semantic
    Enhances,
    Supports,
    Triggers,
    Extends,
    Causes,
    References,
    Contradicts,
}

impl RelationshipType {
    /// Structural types feed the dependency subgraph and cycle detection
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RelationshipType::Composes | RelationshipType::DependsOn | RelationshipType::Inherits
        )
    }
}

/// Directed, weighted edge in the relationship graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipLink {
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub target_id: String,
    /// Always clamped to [0, 1]
    pub strength: f64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// How a composition executes its members
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Sequential,
    Parallel,
}

/// Failure policy for a composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingPolicy {
    pub max_retries: u32,
    pub on_failure: String,
    pub retry_delay_ms: u64,
}

impl Default for ErrorHandlingPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            on_failure: "abort".to_string(),
            retry_delay_ms: 1_000,
        }
    }
}

/// Resource limits for a composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub max_concurrent_workflows: u32,
    /// Memory limit in megabytes
    pub memory_limit: f64,
    pub priority: u32,
    pub time_limit_ms: u64,
}

impl Default for ResourceAllocation {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: 4,
            memory_limit: 1_024.0,
            priority: 5,
            time_limit_ms: 300_000,
        }
    }
}

/// One member of a composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionMember {
    pub workflow_id: String,
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Named aggregate of workflows executed together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<CompositionMember>,
    pub execution_strategy: ExecutionStrategy,
    pub error_handling: ErrorHandlingPolicy,
    pub resource_allocation: ResourceAllocation,
    pub created_at: DateTime<Utc>,
}

/// Graph-position metrics for one workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub connectivity_score: f64,
    pub influence_score: f64,
    pub dependency_score: f64,
    pub collaboration_potential: f64,
}

/// Why two workflows might collaborate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    SharedTargets,
    ComplementaryCapabilities,
    Composition,
}

/// Candidate collaboration between two workflows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationOpportunity {
    pub workflow_id: String,
    pub kind: OpportunityKind,
    pub reason: String,
}

/// Outcome of one relationship optimization pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipOptimization {
    /// (target, new strength) pairs strengthened in place
    pub strengthened: Vec<(String, f64)>,
    /// (target, new strength) pairs weakened in place
    pub weakened: Vec<(String, f64)>,
    /// High-performing workflows worth linking to; not auto-created
    pub suggested: Vec<String>,
    /// Targets whose edges dropped below the removal floor
    pub removed: Vec<String>,
}

/// How a propagated enhancement reaches descendants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStrategy {
    Gradual,
    Immediate,
}

/// Result of pushing an enhancement down inheritance chains
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropagationResult {
    pub propagated_to: Vec<String>,
    pub skipped: Vec<String>,
}

/// Aggregate view of the whole relationship graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcosystemOverview {
    pub total_workflows: usize,
    pub total_relationships: usize,
    pub average_connectivity: f64,
    pub circular_workflows: Vec<String>,
    pub isolated_workflows: Vec<String>,
    /// Highly connected, highly depended-upon workflows
    pub hub_workflows: Vec<String>,
}
