//! Remote event store boundary
//!
//! The mesh persists nothing locally; workflows, enhancements, and
//! relationships live as tagged events on remote hub processes. This
//! module owns the typed event model, the store trait plus concrete
//! clients, and the validated write path.

pub mod models;
pub mod publisher;
pub mod store;

pub use models::{Event, EventFilter, Tag};
pub use publisher::EventPublisher;
pub use store::{EventStore, HttpEventStore, InMemoryEventStore};
