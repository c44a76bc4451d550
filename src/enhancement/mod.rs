//! Self-enhancement: models, the cycle engine, and its scheduler

pub mod engine;
pub mod models;
pub mod scheduler;

pub use engine::EnhancementEngine;
pub use models::{
    CycleReport, Enhancement, EnhancementLoop, EnhancementSource, EnhancementType, FeedbackEntry,
    LearningModel, Priority, RiskLevel, TestResult, TrainingDataPoint, ValidationResult,
};
pub use scheduler::CycleScheduler;
