//! Validated memory-write path
//!
//! The one place in the mesh where hard-required-field violations are
//! rejected with an error instead of clamped: empty content, a missing
//! owner address, or an out-of-range importance never reach the hub.

use super::models::{self, EventFilter, Tag};
use super::store::EventStore;
use crate::discovery::models::WorkflowMetrics;
use crate::enhancement::models::Enhancement;
use crate::error::{MeshError, Result};
use crate::metrics::METRICS;
use crate::relationships::models::RelationshipLink;
use std::sync::Arc;
use tracing::{debug, info};

/// Workflow memory to persist as a tagged event
#[derive(Debug, Clone)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    pub owner_address: String,
    pub content: String,
    pub capabilities: Vec<String>,
    pub requirements: Vec<String>,
    pub importance: f64,
    pub discoverable: bool,
    pub performance: Option<WorkflowMetrics>,
}

/// Publishes workflow memories, enhancement patterns, and relationship
/// edges to hub processes
pub struct EventPublisher {
    store: Arc<dyn EventStore>,
}

impl EventPublisher {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Persist a workflow descriptor
    ///
    /// Discoverable workflows are tagged `public` + `discoverable` so they
    /// become cross-hub visible.
    pub async fn publish_workflow(&self, hub_id: &str, record: WorkflowRecord) -> Result<()> {
        Self::validate_required(&record.content, &record.owner_address, record.importance)?;

        let mut tags = vec![
            Tag::new(models::TAG_AI_TYPE, "workflow"),
            Tag::new(models::TAG_WORKFLOW_ID, record.workflow_id.clone()),
            Tag::new("p", record.owner_address.clone()),
            Tag::new(models::TAG_AI_IMPORTANCE, format!("{}", record.importance)),
        ];

        for capability in &record.capabilities {
            tags.push(Tag::new(models::TAG_WORKFLOW_CAPABILITY, capability.clone()));
        }
        for requirement in &record.requirements {
            tags.push(Tag::new(models::TAG_WORKFLOW_REQUIREMENT, requirement.clone()));
        }

        if record.discoverable {
            tags.push(Tag::new(models::TAG_AI_TAG, models::VIS_PUBLIC));
            tags.push(Tag::new(models::TAG_AI_TAG, models::VIS_DISCOVERABLE));
        }

        if let Some(metrics) = &record.performance {
            let json = serde_json::to_string(metrics)
                .map_err(|e| MeshError::Internal(format!("Failed to encode metrics: {}", e)))?;
            tags.push(Tag::new(models::TAG_WORKFLOW_PERFORMANCE, json));
        }

        self.store
            .publish_event(hub_id, tags, Some(record.content))
            .await?;

        METRICS.events_published.with_label_values(&["workflow"]).inc();
        info!(
            "Published workflow {} to hub {}",
            record.workflow_id, hub_id
        );
        Ok(())
    }

    /// Persist an applied enhancement as a shareable pattern
    pub async fn publish_enhancement(
        &self,
        hub_id: &str,
        owner_address: &str,
        workflow_id: &str,
        enhancement: &Enhancement,
    ) -> Result<()> {
        Self::validate_required(&enhancement.description, owner_address, enhancement.impact)?;

        let json = serde_json::to_string(enhancement)
            .map_err(|e| MeshError::Internal(format!("Failed to encode enhancement: {}", e)))?;

        let tags = vec![
            Tag::new(models::TAG_AI_TYPE, "enhancement"),
            Tag::new(models::TAG_WORKFLOW_ID, workflow_id),
            Tag::new("p", owner_address),
            Tag::new(models::TAG_WORKFLOW_ENHANCEMENT, json),
            Tag::new(models::TAG_AI_TAG, models::VIS_PUBLIC),
            Tag::new(models::TAG_AI_TAG, models::VIS_SHAREABLE),
        ];

        self.store
            .publish_event(hub_id, tags, Some(enhancement.description.clone()))
            .await?;

        METRICS
            .events_published
            .with_label_values(&["enhancement"])
            .inc();
        debug!(
            "Published enhancement {} for workflow {} to hub {}",
            enhancement.id, workflow_id, hub_id
        );
        Ok(())
    }

    /// Persist a relationship edge
    pub async fn publish_relationship(
        &self,
        hub_id: &str,
        owner_address: &str,
        source_id: &str,
        link: &RelationshipLink,
    ) -> Result<()> {
        Self::validate_required(&link.target_id, owner_address, link.strength)?;

        let json = serde_json::to_string(link)
            .map_err(|e| MeshError::Internal(format!("Failed to encode relationship: {}", e)))?;

        let tags = vec![
            Tag::new(models::TAG_AI_TYPE, "relationship"),
            Tag::new(models::TAG_WORKFLOW_ID, source_id),
            Tag::new("p", owner_address),
        ];

        self.store.publish_event(hub_id, tags, Some(json)).await?;

        METRICS
            .events_published
            .with_label_values(&["relationship"])
            .inc();
        debug!(
            "Published relationship {} -> {} to hub {}",
            source_id, link.target_id, hub_id
        );
        Ok(())
    }

    /// Fetch shareable enhancement patterns published for a workflow
    pub async fn fetch_enhancement_patterns(
        &self,
        hub_id: &str,
        workflow_id: &str,
    ) -> Result<Vec<Enhancement>> {
        let filter = EventFilter::for_memory_type("enhancement")
            .with_tag(models::TAG_WORKFLOW_ID, vec![workflow_id.to_string()])
            .with_tag(
                models::TAG_AI_TAG,
                vec![models::VIS_PUBLIC.into(), models::VIS_SHAREABLE.into()],
            );

        let events = self.store.fetch_events(hub_id, &[filter]).await?;

        Ok(events
            .iter()
            .filter_map(|e| e.tag(models::TAG_WORKFLOW_ENHANCEMENT))
            .filter_map(|json| serde_json::from_str(json).ok())
            .collect())
    }

    fn validate_required(content: &str, owner_address: &str, importance: f64) -> Result<()> {
        if content.trim().is_empty() {
            return Err(MeshError::Validation("content must not be empty".into()));
        }
        if owner_address.trim().is_empty() {
            return Err(MeshError::Validation(
                "owner address must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&importance) {
            return Err(MeshError::Validation(format!(
                "importance {} outside [0, 1]",
                importance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::store::InMemoryEventStore;

    fn record(content: &str, owner: &str, importance: f64) -> WorkflowRecord {
        WorkflowRecord {
            workflow_id: "wf-1".into(),
            owner_address: owner.into(),
            content: content.into(),
            capabilities: vec!["format-conversion".into()],
            requirements: vec![],
            importance,
            discoverable: true,
            performance: None,
        }
    }

    #[tokio::test]
    async fn test_publish_workflow_tags_visibility() {
        let store = Arc::new(InMemoryEventStore::new());
        let publisher = EventPublisher::new(store.clone());

        publisher
            .publish_workflow("hub-1", record("A converter", "owner-key", 0.7))
            .await
            .unwrap();

        let events = store
            .fetch_events("hub-1", &[EventFilter::for_memory_type("workflow")])
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].has_visibility(&[models::VIS_PUBLIC, models::VIS_DISCOVERABLE]));
    }

    #[tokio::test]
    async fn test_publish_relationship_roundtrip() {
        let store = Arc::new(InMemoryEventStore::new());
        let publisher = EventPublisher::new(store.clone());
        let link = RelationshipLink {
            relationship_type: crate::relationships::models::RelationshipType::Enhances,
            target_id: "wf-2".into(),
            strength: 0.8,
            metadata: Default::default(),
            created_at: chrono::Utc::now(),
        };

        publisher
            .publish_relationship("hub-1", "owner-key", "wf-1", &link)
            .await
            .unwrap();

        let events = store
            .fetch_events("hub-1", &[EventFilter::for_memory_type("relationship")])
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "wf-1");
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let publisher = EventPublisher::new(Arc::new(InMemoryEventStore::new()));
        let result = publisher
            .publish_workflow("hub-1", record("   ", "owner-key", 0.5))
            .await;
        assert!(matches!(result, Err(MeshError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_owner_rejected() {
        let publisher = EventPublisher::new(Arc::new(InMemoryEventStore::new()));
        let result = publisher
            .publish_workflow("hub-1", record("content", "", 0.5))
            .await;
        assert!(matches!(result, Err(MeshError::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_importance_rejected() {
        let publisher = EventPublisher::new(Arc::new(InMemoryEventStore::new()));
        let result = publisher
            .publish_workflow("hub-1", record("content", "owner-key", 1.5))
            .await;
        assert!(matches!(result, Err(MeshError::Validation(_))));
    }
}
