//! Data models for cross-hub workflow discovery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Performance metrics embedded in a workflow's `workflow_performance` tag
///
/// Field names mirror the JSON the hubs carry. Absent or malformed tags
/// fall back to [`WorkflowMetrics::neutral`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowMetrics {
    pub average_execution_time: f64,
    pub success_rate: f64,
    pub quality_score: f64,
    pub user_satisfaction_rating: f64,
    pub enhancement_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_enhancement_date: Option<DateTime<Utc>>,
}

impl Default for WorkflowMetrics {
    fn default() -> Self {
        Self::neutral()
    }
}

impl WorkflowMetrics {
    /// Neutral metrics assumed when a workflow publishes none
    pub fn neutral() -> Self {
        Self {
            average_execution_time: 0.0,
            success_rate: 0.5,
            quality_score: 0.5,
            user_satisfaction_rating: 0.5,
            enhancement_count: 0,
            last_enhancement_date: None,
        }
    }

    pub fn has_enhancements(&self) -> bool {
        self.enhancement_count > 0 || self.last_enhancement_date.is_some()
    }
}

/// Discovery-time projection of a remote workflow event
///
/// Derived fresh from hub events on each query; the hub event log stays
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteWorkflow {
    pub workflow_id: String,
    pub hub_id: String,
    pub owner_address: String,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub requirements: Vec<String>,
    pub tags: Vec<String>,
    pub performance: WorkflowMetrics,
    /// Recomputed via the fixed weighted formula, never stored as truth
    pub reputation_score: f64,
    pub is_public: bool,
    pub usage_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Basic information about one hub process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubInfo {
    pub hub_id: String,
    pub workflow_count: usize,
    pub average_quality: f64,
    pub reputation: f64,
}

/// Aggregate statistics across the reachable hub network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub total_hubs: usize,
    pub total_workflows: usize,
    pub average_reputation: f64,
    /// Top capability names with their frequencies, most common first
    pub top_capabilities: Vec<(String, usize)>,
    pub health_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl Default for NetworkStatistics {
    fn default() -> Self {
        Self {
            total_hubs: 0,
            total_workflows: 0,
            average_reputation: 0.0,
            top_capabilities: Vec::new(),
            health_score: 0.0,
            updated_at: Utc::now(),
        }
    }
}

/// Query signature used as the discovery cache key
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuerySignature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_performance_defaults_neutral() {
        let parsed: WorkflowMetrics =
            serde_json::from_str("{\"qualityScore\": 0.9}").unwrap();
        assert!((parsed.quality_score - 0.9).abs() < f64::EPSILON);
        assert!((parsed.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(parsed.enhancement_count, 0);
    }

    #[test]
    fn test_camel_case_wire_names() {
        let json = serde_json::to_value(WorkflowMetrics::neutral()).unwrap();
        assert!(json.get("successRate").is_some());
        assert!(json.get("averageExecutionTime").is_some());
    }
}
