//! Cross-hub workflow discovery and ranking

pub mod cache;
pub mod models;
pub mod service;

pub use models::{HubInfo, NetworkStatistics, QuerySignature, RemoteWorkflow, WorkflowMetrics};
pub use service::DiscoveryService;
