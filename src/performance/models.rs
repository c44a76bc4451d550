//! Data models for performance tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource consumption of one execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU time in milliseconds
    pub cpu_time: f64,
    /// Memory high-water mark in megabytes
    pub memory_usage: f64,
    pub network_requests: f64,
    pub storage_operations: f64,
    pub tool_calls: f64,
}

/// Metrics from one workflow execution
///
/// Appended, never mutated. Values are recorded as the caller reports
/// them; range enforcement is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Wall-clock execution time in milliseconds
    pub execution_time: f64,
    pub success: bool,
    /// Error rate in [0, 1]
    pub error_rate: f64,
    /// Output quality in [0, 1]
    pub quality_score: f64,
    /// Fraction of the workflow completed, [0, 1]
    pub completion_rate: f64,
    pub retry_count: u32,
    pub resource_usage: ResourceUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_satisfaction: Option<f64>,
    pub last_executed: DateTime<Utc>,
}

impl PerformanceSample {
    /// Unweighted composite health of this sample
    ///
    /// Mean of success, inverted error rate, quality, completion, and
    /// user satisfaction (0.5 when unreported).
    pub fn health(&self) -> f64 {
        let success = if self.success { 1.0 } else { 0.0 };
        let satisfaction = self.user_satisfaction.unwrap_or(0.5);
        (success + (1.0 - self.error_rate) + self.quality_score + self.completion_rate
            + satisfaction)
            / 5.0
    }
}

/// Metric tracked by trend analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    ExecutionTime,
    ErrorRate,
    QualityScore,
    CompletionRate,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 4] = [
        TrendMetric::ExecutionTime,
        TrendMetric::ErrorRate,
        TrendMetric::QualityScore,
        TrendMetric::CompletionRate,
    ];

    /// Whether a falling value means the workflow is getting better
    pub fn lower_is_better(&self) -> bool {
        matches!(self, TrendMetric::ExecutionTime | TrendMetric::ErrorRate)
    }

    pub fn extract(&self, sample: &PerformanceSample) -> f64 {
        match self {
            TrendMetric::ExecutionTime => sample.execution_time,
            TrendMetric::ErrorRate => sample.error_rate,
            TrendMetric::QualityScore => sample.quality_score,
            TrendMetric::CompletionRate => sample.completion_rate,
        }
    }
}

/// Direction a metric is moving
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Regression-derived trend for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceTrend {
    pub metric: TrendMetric,
    pub direction: TrendDirection,
    /// R² of the fit, clamped to [0, 1]
    pub confidence: f64,
    /// Number of samples the fit covered
    pub time_window: usize,
    /// The fitted values, most recent last
    pub samples: Vec<f64>,
}

/// Field-wise mean over a workflow's history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AverageSample {
    pub execution_time: f64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub quality_score: f64,
    pub completion_rate: f64,
    pub retry_count: f64,
    pub resource_usage: ResourceUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_satisfaction: Option<f64>,
}

/// Aggregate view of one workflow's recorded performance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub current: Option<PerformanceSample>,
    pub average: Option<AverageSample>,
    /// Health delta between the latest sample and the baseline
    pub improvement: f64,
    pub trends: Vec<PerformanceTrend>,
}

/// Threshold-driven optimization report for one workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub recommendations: Vec<String>,
    /// Summed expected impact, capped at 1.0
    pub expected_impact: f64,
    pub priority: crate::enhancement::models::Priority,
}
