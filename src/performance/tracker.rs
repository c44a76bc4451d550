//! Per-workflow performance tracking and trend analysis
//!
//! All computation here is synchronous and in-memory. Unknown workflow
//! IDs yield empty/default results rather than errors.

use super::models::*;
use crate::config::PerformanceConfig;
use crate::enhancement::models::{
    Enhancement, EnhancementSource, EnhancementType, Priority, RiskLevel, TestResult,
    ValidationResult,
};
use crate::metrics::METRICS;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::VecDeque;
use tracing::debug;

/// Records execution samples, derives trends, and surfaces enhancement
/// opportunities
pub struct PerformanceTracker {
    config: PerformanceConfig,
    histories: DashMap<String, VecDeque<PerformanceSample>>,
    baselines: DashMap<String, PerformanceSample>,
    tracked_enhancements: DashMap<String, Vec<Enhancement>>,
}

impl PerformanceTracker {
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            config,
            histories: DashMap::new(),
            baselines: DashMap::new(),
            tracked_enhancements: DashMap::new(),
        }
    }

    /// Append a sample, evicting the oldest beyond the history cap
    pub fn record_performance(&self, workflow_id: &str, sample: PerformanceSample) {
        self.baselines
            .entry(workflow_id.to_string())
            .or_insert_with(|| sample.clone());

        let mut history = self.histories.entry(workflow_id.to_string()).or_default();
        history.push_back(sample);
        while history.len() > self.config.history_cap {
            history.pop_front();
        }

        METRICS.samples_recorded.inc();
    }

    /// Remember an applied enhancement together with its measured impact
    pub fn track_enhancement(&self, workflow_id: &str, enhancement: Enhancement) {
        let mut tracked = self
            .tracked_enhancements
            .entry(workflow_id.to_string())
            .or_default();
        tracked.push(enhancement);
        let cap = 500;
        if tracked.len() > cap {
            let excess = tracked.len() - cap;
            tracked.drain(..excess);
        }
    }

    /// Aggregate view over the recorded history
    pub fn get_performance_stats(&self, workflow_id: &str) -> PerformanceStats {
        let history = match self.histories.get(workflow_id) {
            Some(h) if !h.is_empty() => h,
            _ => return PerformanceStats::default(),
        };

        let current = history.back().cloned();
        let average = Some(Self::average(history.iter()));

        let improvement = match (&current, self.baselines.get(workflow_id)) {
            (Some(current), Some(baseline)) => current.health() - baseline.health(),
            _ => 0.0,
        };

        drop(history);

        PerformanceStats {
            current,
            average,
            improvement,
            trends: self.calculate_trends(workflow_id),
        }
    }

    /// OLS trend per tracked metric over the most recent window
    ///
    /// Polarity is applied per metric: a falling execution time or error
    /// rate reads as improving, a falling quality or completion rate as
    /// declining. Requires at least `min_samples`, else empty.
    pub fn calculate_trends(&self, workflow_id: &str) -> Vec<PerformanceTrend> {
        let history = match self.histories.get(workflow_id) {
            Some(h) if h.len() >= self.config.min_samples => h,
            _ => return Vec::new(),
        };

        let start = history.len().saturating_sub(self.config.trend_window);

        TrendMetric::ALL
            .iter()
            .map(|metric| {
                let values: Vec<f64> = history
                    .iter()
                    .skip(start)
                    .map(|s| metric.extract(s))
                    .collect();
                let (slope, r_squared) = ols_fit(&values);

                let direction = if slope.abs() < self.config.stable_slope {
                    TrendDirection::Stable
                } else {
                    let rising = slope > 0.0;
                    if rising != metric.lower_is_better() {
                        TrendDirection::Improving
                    } else {
                        TrendDirection::Declining
                    }
                };

                PerformanceTrend {
                    metric: *metric,
                    direction,
                    confidence: r_squared.clamp(0.0, 1.0),
                    time_window: values.len(),
                    samples: values,
                }
            })
            .collect()
    }

    /// Run the heuristic detectors over the recent sample window
    ///
    /// Each detector is independent and may fire in combination. Requires
    /// at least `min_samples` recorded, else empty.
    pub fn identify_enhancements(&self, workflow_id: &str) -> Vec<Enhancement> {
        let history = match self.histories.get(workflow_id) {
            Some(h) if h.len() >= self.config.min_samples => h,
            _ => return Vec::new(),
        };

        let start = history.len().saturating_sub(self.config.detector_window);
        let window: Vec<&PerformanceSample> = history.iter().skip(start).collect();
        let mut found = Vec::new();

        // Degradation: second-half execution time >20% above first half
        let mid = window.len() / 2;
        if mid > 0 {
            let first = mean(window[..mid].iter().map(|s| s.execution_time));
            let second = mean(window[mid..].iter().map(|s| s.execution_time));
            if second > first * 1.2 {
                found.push(Enhancement::new(
                    EnhancementType::Optimization,
                    format!(
                        "Execution time degraded from {:.0}ms to {:.0}ms; optimize the hot path",
                        first, second
                    ),
                    0.3,
                    EnhancementSource::Performance,
                ));
            }
        }

        let error_rate = mean(window.iter().map(|s| s.error_rate));
        if error_rate > 0.1 {
            found.push(Enhancement::new(
                EnhancementType::ErrorHandling,
                format!(
                    "Error rate {:.0}% exceeds 10%; add retries and input validation",
                    error_rate * 100.0
                ),
                0.4,
                EnhancementSource::Performance,
            ));
        }

        let memory = mean(window.iter().map(|s| s.resource_usage.memory_usage));
        let cpu = mean(window.iter().map(|s| s.resource_usage.cpu_time));
        if memory > 500.0 || cpu > 10_000.0 {
            found.push(Enhancement::new(
                EnhancementType::Optimization,
                format!(
                    "Resource usage is heavy (memory {:.0}MB, cpu {:.0}ms); reduce allocations",
                    memory, cpu
                ),
                0.25,
                EnhancementSource::Performance,
            ));
        }

        let quality = mean(window.iter().map(|s| s.quality_score));
        if quality < 0.8 {
            found.push(Enhancement::new(
                EnhancementType::FeatureAdd,
                format!(
                    "Quality score {:.2} below 0.8; add output verification steps",
                    quality
                ),
                0.35,
                EnhancementSource::Performance,
            ));
        }

        let satisfaction: Vec<f64> = window
            .iter()
            .filter_map(|s| s.user_satisfaction)
            .collect();
        if !satisfaction.is_empty() {
            let satisfaction = mean(satisfaction.iter().copied());
            if satisfaction < 0.7 {
                found.push(Enhancement::new(
                    EnhancementType::UserExperience,
                    format!(
                        "User satisfaction {:.2} below 0.7; improve progress reporting",
                        satisfaction
                    ),
                    0.4,
                    EnhancementSource::Performance,
                ));
            }
        }

        debug!(
            "Identified {} enhancement opportunities for {}",
            found.len(),
            workflow_id
        );
        for enhancement in &found {
            METRICS
                .enhancements_identified
                .with_label_values(&["performance"])
                .inc();
            let _ = enhancement;
        }

        found
    }

    /// Merge declining trends and detector output into one report
    pub fn generate_optimization_recommendations(&self, workflow_id: &str) -> OptimizationReport {
        let trends = self.calculate_trends(workflow_id);
        let enhancements = self.identify_enhancements(workflow_id);

        let mut recommendations = Vec::new();
        let mut strong_decline = false;

        for trend in &trends {
            if trend.direction == TrendDirection::Declining && trend.confidence > 0.8 {
                strong_decline = true;
                recommendations.push(format!(
                    "{:?} is declining with confidence {:.2}; investigate recent changes",
                    trend.metric, trend.confidence
                ));
            }
        }

        let mut expected_impact = 0.0;
        let mut high_impact = false;
        for enhancement in &enhancements {
            expected_impact += enhancement.impact;
            if enhancement.impact > 0.3 {
                high_impact = true;
            }
            recommendations.push(enhancement.description.clone());
        }

        let priority = if strong_decline || high_impact {
            Priority::High
        } else if !recommendations.is_empty() {
            Priority::Medium
        } else {
            Priority::Low
        };

        OptimizationReport {
            recommendations,
            expected_impact: expected_impact.min(1.0),
            priority,
        }
    }

    /// Assess an enhancement against its test results
    ///
    /// Risk derives from type and impact; confidence is the mean of the
    /// pass rate and the average test score. Valid only when every test
    /// passed and confidence exceeds 0.7.
    pub fn validate_enhancement(
        &self,
        workflow_id: &str,
        enhancement: &Enhancement,
        test_results: Vec<TestResult>,
    ) -> ValidationResult {
        let risk = Self::assess_risk(enhancement);

        let (confidence, all_passed) = if test_results.is_empty() {
            (0.0, false)
        } else {
            let pass_rate = test_results.iter().filter(|t| t.passed).count() as f64
                / test_results.len() as f64;
            let avg_score = mean(test_results.iter().map(|t| t.score));
            ((pass_rate + avg_score) / 2.0, pass_rate >= 1.0)
        };

        let is_valid = all_passed && confidence > 0.7;

        debug!(
            "Validated enhancement {} for {}: valid={}, confidence={:.2}, risk={:?}",
            enhancement.id, workflow_id, is_valid, confidence, risk
        );

        ValidationResult {
            is_valid,
            confidence,
            risk_assessment: risk,
            test_results,
            validated_at: Utc::now(),
        }
    }

    fn assess_risk(enhancement: &Enhancement) -> RiskLevel {
        if enhancement.enhancement_type == EnhancementType::Refactor || enhancement.impact > 0.5 {
            return RiskLevel::High;
        }
        match enhancement.enhancement_type {
            EnhancementType::BugFix | EnhancementType::ParameterTune
                if enhancement.impact < 0.3 =>
            {
                RiskLevel::Low
            }
            _ => RiskLevel::Medium,
        }
    }

    /// Unweighted composite health over the recorded history
    pub fn calculate_health_score(&self, workflow_id: &str) -> f64 {
        match self.histories.get(workflow_id) {
            Some(h) if !h.is_empty() => mean(h.iter().map(|s| s.health())),
            _ => 0.0,
        }
    }

    /// Applied enhancements tracked for this workflow
    pub fn tracked_enhancements(&self, workflow_id: &str) -> Vec<Enhancement> {
        self.tracked_enhancements
            .get(workflow_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Number of samples recorded for a workflow
    pub fn sample_count(&self, workflow_id: &str) -> usize {
        self.histories.get(workflow_id).map(|h| h.len()).unwrap_or(0)
    }

    /// Workflow IDs with at least one recorded sample
    pub fn tracked_workflows(&self) -> Vec<String> {
        self.histories.iter().map(|e| e.key().clone()).collect()
    }

    fn average<'a>(samples: impl Iterator<Item = &'a PerformanceSample>) -> AverageSample {
        let samples: Vec<&PerformanceSample> = samples.collect();
        let n = samples.len() as f64;
        if samples.is_empty() {
            return AverageSample::default();
        }

        let satisfaction: Vec<f64> = samples.iter().filter_map(|s| s.user_satisfaction).collect();

        AverageSample {
            execution_time: samples.iter().map(|s| s.execution_time).sum::<f64>() / n,
            success_rate: samples.iter().filter(|s| s.success).count() as f64 / n,
            error_rate: samples.iter().map(|s| s.error_rate).sum::<f64>() / n,
            quality_score: samples.iter().map(|s| s.quality_score).sum::<f64>() / n,
            completion_rate: samples.iter().map(|s| s.completion_rate).sum::<f64>() / n,
            retry_count: samples.iter().map(|s| s.retry_count as f64).sum::<f64>() / n,
            resource_usage: ResourceUsage {
                cpu_time: samples.iter().map(|s| s.resource_usage.cpu_time).sum::<f64>() / n,
                memory_usage: samples
                    .iter()
                    .map(|s| s.resource_usage.memory_usage)
                    .sum::<f64>()
                    / n,
                network_requests: samples
                    .iter()
                    .map(|s| s.resource_usage.network_requests)
                    .sum::<f64>()
                    / n,
                storage_operations: samples
                    .iter()
                    .map(|s| s.resource_usage.storage_operations)
                    .sum::<f64>()
                    / n,
                tool_calls: samples
                    .iter()
                    .map(|s| s.resource_usage.tool_calls)
                    .sum::<f64>()
                    / n,
            },
            user_satisfaction: if satisfaction.is_empty() {
                None
            } else {
                Some(mean(satisfaction.iter().copied()))
            },
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Ordinary least squares over index-vs-value pairs
///
/// Returns (slope, R²). Degenerate inputs yield (0, 0).
fn ols_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, 0.0);
    }

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return (0.0, 0.0);
    }

    let slope = cov / var_x;
    let r_squared = (cov * cov) / (var_x * var_y);
    (slope, r_squared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(execution_time: f64, error_rate: f64, quality: f64) -> PerformanceSample {
        PerformanceSample {
            execution_time,
            success: true,
            error_rate,
            quality_score: quality,
            completion_rate: 1.0,
            retry_count: 0,
            resource_usage: ResourceUsage::default(),
            user_satisfaction: None,
            last_executed: Utc::now(),
        }
    }

    fn tracker() -> PerformanceTracker {
        PerformanceTracker::new(PerformanceConfig::default())
    }

    #[test]
    fn test_history_cap_fifo() {
        let t = tracker();
        for i in 0..120 {
            t.record_performance("wf-1", sample(i as f64, 0.0, 0.9));
        }

        assert_eq!(t.sample_count("wf-1"), 100);
        let stats = t.get_performance_stats("wf-1");
        // Oldest 20 evicted: average starts at sample 20
        let avg = stats.average.unwrap();
        assert!(avg.execution_time >= 20.0);
        assert!((stats.current.unwrap().execution_time - 119.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_history_yields_defaults() {
        let t = tracker();
        let stats = t.get_performance_stats("missing");
        assert!(stats.current.is_none());
        assert!(stats.average.is_none());
        assert!(stats.trends.is_empty());
        assert_eq!(t.calculate_health_score("missing"), 0.0);
    }

    #[test]
    fn test_trends_require_minimum_samples() {
        let t = tracker();
        for i in 0..4 {
            t.record_performance("wf-1", sample(1000.0 + i as f64, 0.0, 0.9));
        }
        assert!(t.calculate_trends("wf-1").is_empty());
        assert!(t.identify_enhancements("wf-1").is_empty());

        t.record_performance("wf-1", sample(1004.0, 0.0, 0.9));
        assert_eq!(t.calculate_trends("wf-1").len(), 4);
    }

    // Polarity decision: the upstream design treated every positive slope
    // as improving; here execution time and error rate are lower-is-better,
    // so a rising execution time reads as declining.
    #[test]
    fn test_rising_execution_time_is_declining() {
        let t = tracker();
        for i in 0..10 {
            t.record_performance("wf-1", sample(1000.0 + 100.0 * i as f64, 0.02, 0.95));
        }

        let trends = t.calculate_trends("wf-1");
        let exec = trends
            .iter()
            .find(|tr| tr.metric == TrendMetric::ExecutionTime)
            .unwrap();
        assert_eq!(exec.direction, TrendDirection::Declining);
        assert!(exec.confidence > 0.99);
    }

    #[test]
    fn test_falling_error_rate_is_improving() {
        let t = tracker();
        for i in 0..10 {
            t.record_performance("wf-1", sample(1000.0, 0.5 - 0.05 * i as f64, 0.95));
        }

        let trends = t.calculate_trends("wf-1");
        let err = trends
            .iter()
            .find(|tr| tr.metric == TrendMetric::ErrorRate)
            .unwrap();
        assert_eq!(err.direction, TrendDirection::Improving);
    }

    #[test]
    fn test_flat_metric_is_stable_with_zero_confidence() {
        let t = tracker();
        for _ in 0..10 {
            t.record_performance("wf-1", sample(1000.0, 0.02, 0.95));
        }

        for trend in t.calculate_trends("wf-1") {
            assert_eq!(trend.direction, TrendDirection::Stable);
            assert_eq!(trend.confidence, 0.0);
        }
    }

    #[test]
    fn test_degradation_detector_fires_alone() {
        let t = tracker();
        // 1000ms..2500ms strictly increasing, low error rate, high quality
        for i in 0..10 {
            let time = 1000.0 + (1500.0 / 9.0) * i as f64;
            t.record_performance("wf-1", sample(time, 0.02, 0.95));
        }

        let found = t.identify_enhancements("wf-1");
        let optimizations: Vec<_> = found
            .iter()
            .filter(|e| e.enhancement_type == EnhancementType::Optimization)
            .collect();
        assert_eq!(optimizations.len(), 1);
        assert!((optimizations[0].impact - 0.3).abs() < f64::EPSILON);
        assert!(!found
            .iter()
            .any(|e| e.enhancement_type == EnhancementType::ErrorHandling));
    }

    #[test]
    fn test_error_rate_detector() {
        let t = tracker();
        for _ in 0..10 {
            t.record_performance("wf-1", sample(1000.0, 0.2, 0.95));
        }

        let found = t.identify_enhancements("wf-1");
        let handler = found
            .iter()
            .find(|e| e.enhancement_type == EnhancementType::ErrorHandling)
            .unwrap();
        assert!((handler.impact - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detectors_fire_in_combination() {
        let t = tracker();
        for i in 0..10 {
            let mut s = sample(1000.0 + 200.0 * i as f64, 0.3, 0.5);
            s.resource_usage.memory_usage = 800.0;
            s.user_satisfaction = Some(0.4);
            t.record_performance("wf-1", s);
        }

        let found = t.identify_enhancements("wf-1");
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_validation_risk_tiers() {
        let t = tracker();
        let low = Enhancement::new(
            EnhancementType::BugFix,
            "small fix",
            0.1,
            EnhancementSource::Performance,
        );
        let high = Enhancement::new(
            EnhancementType::Refactor,
            "rewrite",
            0.2,
            EnhancementSource::Performance,
        );
        let big = Enhancement::new(
            EnhancementType::Optimization,
            "big change",
            0.6,
            EnhancementSource::Performance,
        );
        let medium = Enhancement::new(
            EnhancementType::Optimization,
            "tune",
            0.3,
            EnhancementSource::Performance,
        );

        let tests = vec![TestResult::new("t", true, 0.9)];
        assert_eq!(
            t.validate_enhancement("wf", &low, tests.clone()).risk_assessment,
            RiskLevel::Low
        );
        assert_eq!(
            t.validate_enhancement("wf", &high, tests.clone()).risk_assessment,
            RiskLevel::High
        );
        assert_eq!(
            t.validate_enhancement("wf", &big, tests.clone()).risk_assessment,
            RiskLevel::High
        );
        assert_eq!(
            t.validate_enhancement("wf", &medium, tests).risk_assessment,
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_validation_requires_all_passed_and_confidence() {
        let t = tracker();
        let e = Enhancement::new(
            EnhancementType::Optimization,
            "x",
            0.3,
            EnhancementSource::Performance,
        );

        let failing = vec![
            TestResult::new("a", true, 0.9),
            TestResult::new("b", false, 0.9),
        ];
        assert!(!t.validate_enhancement("wf", &e, failing).is_valid);

        let weak = vec![TestResult::new("a", true, 0.2)];
        let result = t.validate_enhancement("wf", &e, weak);
        // pass rate 1.0, score 0.2 -> confidence 0.6, below the 0.7 bar
        assert!(!result.is_valid);
        assert!((result.confidence - 0.6).abs() < 1e-9);

        let strong = vec![TestResult::new("a", true, 0.9)];
        assert!(t.validate_enhancement("wf", &e, strong).is_valid);
    }

    #[test]
    fn test_recommendations_priority_promotion() {
        let t = tracker();
        for _ in 0..10 {
            t.record_performance("wf-1", sample(1000.0, 0.2, 0.95));
        }

        // Error-rate detector fires with impact 0.4 > 0.3
        let report = t.generate_optimization_recommendations("wf-1");
        assert_eq!(report.priority, Priority::High);
        assert!(!report.recommendations.is_empty());
        assert!(report.expected_impact <= 1.0);
    }

    #[test]
    fn test_recommendations_empty_history_low_priority() {
        let t = tracker();
        let report = t.generate_optimization_recommendations("missing");
        assert_eq!(report.priority, Priority::Low);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_improvement_against_baseline() {
        let t = tracker();
        t.record_performance("wf-1", sample(1000.0, 0.5, 0.4));
        t.record_performance("wf-1", sample(900.0, 0.1, 0.9));

        let stats = t.get_performance_stats("wf-1");
        assert!(stats.improvement > 0.0);
    }
}
