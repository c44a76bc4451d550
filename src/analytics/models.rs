//! Analytics output types

use serde::{Deserialize, Serialize};

/// Seven normalized sub-scores plus their unweighted mean
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcosystemHealth {
    pub enhancement_success_rate: f64,
    pub enhancement_avg_impact: f64,
    pub network_density: f64,
    pub influence_score: f64,
    pub knowledge_retention: f64,
    pub transfer_efficiency: f64,
    pub normalized_learning_rate: f64,
    pub overall: f64,
}

/// One of the ten taxonomic buckets, or "uncategorized"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCategory(pub String);

impl WorkflowCategory {
    pub fn uncategorized() -> Self {
        Self("uncategorized".to_string())
    }
}

impl std::fmt::Display for WorkflowCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
