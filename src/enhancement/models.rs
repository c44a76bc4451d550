//! Data models for the enhancement lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change an enhancement proposes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementType {
    Optimization,
    BugFix,
    FeatureAdd,
    Refactor,
    ParameterTune,
    LogicImprove,
    ErrorHandling,
    UserExperience,
}

/// Risk attributed to applying an enhancement
///
/// Ordering matters: application processes candidates lowest risk first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Impact dampening applied when an enhancement of this risk lands
    pub fn impact_multiplier(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.95,
            RiskLevel::Medium => 0.85,
            RiskLevel::High => 0.7,
            RiskLevel::Critical => 0.0,
        }
    }
}

/// Outcome of one validation test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    /// Quality of the result in [0, 1]
    pub score: f64,
}

impl TestResult {
    pub fn new(name: impl Into<String>, passed: bool, score: f64) -> Self {
        Self {
            name: name.into(),
            passed,
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Validation verdict attached to an enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub risk_assessment: RiskLevel,
    pub test_results: Vec<TestResult>,
    pub validated_at: DateTime<Utc>,
}

/// Where an enhancement candidate came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementSource {
    Performance,
    PeerLearning,
    Emergent,
    Analytics,
    UserFeedback,
    ErrorReport,
}

/// A proposed change to a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enhancement {
    pub id: String,
    #[serde(rename = "type")]
    pub enhancement_type: EnhancementType,
    pub description: String,
    /// Estimated impact in [0, 1]
    pub impact: f64,
    /// Measured impact, set only after a passing validation and application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_impact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    pub source: EnhancementSource,
    pub created_at: DateTime<Utc>,
}

impl Enhancement {
    pub fn new(
        enhancement_type: EnhancementType,
        description: impl Into<String>,
        impact: f64,
        source: EnhancementSource,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enhancement_type,
            description: description.into(),
            impact: impact.clamp(0.0, 1.0),
            actual_impact: None,
            validation: None,
            code: None,
            parameters: None,
            source,
            created_at: Utc::now(),
        }
    }

    /// Whether validation passed and the risk allows application
    pub fn is_applicable(&self, min_confidence: f64) -> bool {
        match &self.validation {
            Some(v) => {
                v.is_valid
                    && v.risk_assessment != RiskLevel::Critical
                    && v.confidence > min_confidence
            }
            None => false,
        }
    }
}

/// Priority attached to recommendations and feedback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// One data point fed into a workflow's learning model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataPoint {
    pub enhancement_type: EnhancementType,
    pub predicted_impact: f64,
    pub actual_impact: f64,
    pub success: bool,
    /// Health score snapshot at the time the enhancement landed
    pub performance_snapshot: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Reinforcement-style learning model attached to a workflow's loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningModel {
    pub model_type: String,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub training_data: Vec<TrainingDataPoint>,
    pub accuracy: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for LearningModel {
    fn default() -> Self {
        Self {
            model_type: "reinforcement".to_string(),
            learning_rate: 0.01,
            discount_factor: 0.95,
            exploration_rate: 0.1,
            training_data: Vec::new(),
            accuracy: 0.5,
            last_updated: Utc::now(),
        }
    }
}

/// User feedback entry recorded against a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub feedback: String,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub detected_issues: Vec<String>,
    pub priority: Priority,
    pub recorded_at: DateTime<Utc>,
}

/// Per-workflow self-enhancement loop state
#[derive(Debug, Clone)]
pub struct EnhancementLoop {
    pub workflow_id: String,
    pub current_version: u32,
    pub optimization_targets: Vec<String>,
    pub learning_model: LearningModel,
    pub applied: Vec<Enhancement>,
    pub rejected: Vec<Enhancement>,
    pub feedback: Vec<FeedbackEntry>,
}

impl EnhancementLoop {
    pub fn new(workflow_id: String, optimization_targets: Vec<String>) -> Self {
        Self {
            workflow_id,
            current_version: 1,
            optimization_targets,
            learning_model: LearningModel::default(),
            applied: Vec::new(),
            rejected: Vec::new(),
            feedback: Vec::new(),
        }
    }
}

/// Result of one enhancement cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Everything identified this cycle, applied or not
    pub enhancements: Vec<Enhancement>,
    pub applied: Vec<Enhancement>,
    /// Validated but not applied
    pub rejected: Vec<Enhancement>,
    /// Delay hint until the next cycle, in milliseconds
    pub next_cycle_in: u64,
}

impl CycleReport {
    /// Empty report with the slowest retry interval
    pub fn idle() -> Self {
        Self {
            next_cycle_in: 86_400_000,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering_low_first() {
        let mut risks = vec![
            RiskLevel::Critical,
            RiskLevel::Low,
            RiskLevel::High,
            RiskLevel::Medium,
        ];
        risks.sort();
        assert_eq!(
            risks,
            vec![
                RiskLevel::Low,
                RiskLevel::Medium,
                RiskLevel::High,
                RiskLevel::Critical
            ]
        );
    }

    #[test]
    fn test_enhancement_impact_clamped() {
        let e = Enhancement::new(
            EnhancementType::Optimization,
            "cap",
            1.7,
            EnhancementSource::Performance,
        );
        assert!((e.impact - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unvalidated_enhancement_not_applicable() {
        let e = Enhancement::new(
            EnhancementType::Optimization,
            "x",
            0.5,
            EnhancementSource::Performance,
        );
        assert!(!e.is_applicable(0.6));
    }

    #[test]
    fn test_type_serializes_snake_case() {
        let json = serde_json::to_string(&EnhancementType::ErrorHandling).unwrap();
        assert_eq!(json, "\"error_handling\"");
    }
}
