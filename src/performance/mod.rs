//! Performance tracking and trend analysis

pub mod models;
pub mod tracker;

pub use models::{
    AverageSample, OptimizationReport, PerformanceSample, PerformanceStats, PerformanceTrend,
    ResourceUsage, TrendDirection, TrendMetric,
};
pub use tracker::PerformanceTracker;
