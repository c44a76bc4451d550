//! Workflow enhancement and discovery over a decentralized memory mesh.
//!
//! Workflows publish themselves as tagged events to remote hubs; this
//! crate tracks their performance, proposes and applies enhancements
//! through a learning loop, maintains the relationship graph between
//! them, and discovers and ranks workflows across hubs.
//!
//! [`Mesh`] wires the services together with shared handles; every
//! service can also be constructed on its own.

pub mod analytics;
pub mod config;
pub mod discovery;
pub mod enhancement;
pub mod error;
pub mod events;
pub mod metrics;
pub mod performance;
pub mod relationships;

pub use analytics::AnalyticsService;
pub use config::MeshConfig;
pub use discovery::DiscoveryService;
pub use enhancement::{CycleScheduler, EnhancementEngine};
pub use error::{MeshError, Result};
pub use events::{EventPublisher, EventStore, HttpEventStore, InMemoryEventStore};
pub use performance::PerformanceTracker;
pub use relationships::RelationshipManager;

use std::sync::Arc;

/// Install the global tracing subscriber
///
/// Level comes from the config but `RUST_LOG` wins when set. Safe to
/// call once per process; later calls are ignored.
pub fn init_tracing(config: &config::LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// The assembled subsystem
///
/// All cross-service wiring happens here; the services themselves never
/// construct each other.
pub struct Mesh {
    pub tracker: Arc<PerformanceTracker>,
    pub relationships: Arc<RelationshipManager>,
    pub engine: Arc<EnhancementEngine>,
    pub discovery: Arc<DiscoveryService>,
    pub analytics: Arc<AnalyticsService>,
    pub publisher: Arc<EventPublisher>,
}

impl Mesh {
    pub fn new(config: MeshConfig, store: Arc<dyn EventStore>) -> Self {
        let tracker = Arc::new(PerformanceTracker::new(config.performance.clone()));
        let relationships = Arc::new(RelationshipManager::new());
        let publisher = Arc::new(EventPublisher::new(Arc::clone(&store)));
        let engine = Arc::new(EnhancementEngine::new(
            config.enhancement.clone(),
            Arc::clone(&tracker),
            Arc::clone(&relationships),
        ));
        let discovery = Arc::new(DiscoveryService::new(
            Arc::clone(&store),
            config.discovery.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&tracker),
            Arc::clone(&relationships),
            Arc::clone(&engine),
        ));

        Self {
            tracker,
            relationships,
            engine,
            discovery,
            analytics,
            publisher,
        }
    }

    /// Like [`Mesh::new`], but the engine also pulls peer enhancement
    /// patterns from the given home hub
    pub fn with_home_hub(config: MeshConfig, store: Arc<dyn EventStore>, hub_id: &str) -> Self {
        let tracker = Arc::new(PerformanceTracker::new(config.performance.clone()));
        let relationships = Arc::new(RelationshipManager::new());
        let publisher = Arc::new(EventPublisher::new(Arc::clone(&store)));
        let engine = Arc::new(
            EnhancementEngine::new(
                config.enhancement.clone(),
                Arc::clone(&tracker),
                Arc::clone(&relationships),
            )
            .with_peer_source(Arc::clone(&publisher), hub_id),
        );
        let discovery = Arc::new(DiscoveryService::new(
            Arc::clone(&store),
            config.discovery.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&tracker),
            Arc::clone(&relationships),
            Arc::clone(&engine),
        ));

        Self {
            tracker,
            relationships,
            engine,
            discovery,
            analytics,
            publisher,
        }
    }

    /// Background cycle scheduler bound to this mesh's engine
    pub fn scheduler(&self) -> CycleScheduler {
        CycleScheduler::new(Arc::clone(&self.engine))
    }
}
