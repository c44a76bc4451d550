//! Aggregate analytics over the live services

pub mod models;
pub mod service;

pub use models::{EcosystemHealth, WorkflowCategory};
pub use service::AnalyticsService;
