//! Workflow relationship graph management

pub mod manager;
pub mod models;

pub use manager::RelationshipManager;
pub use models::{
    CollaborationOpportunity, Composition, CompositionMember, EcosystemOverview,
    ErrorHandlingPolicy, ExecutionStrategy, NetworkMetrics, OpportunityKind, PropagationResult,
    PropagationStrategy, RelationshipLink, RelationshipOptimization, RelationshipType,
    ResourceAllocation,
};
