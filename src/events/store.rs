//! Event store clients
//!
//! [`EventStore`] is the one external capability the mesh depends on:
//! fetch tagged events by filter, publish new tagged events. The HTTP
//! client talks to real hub processes; the in-memory store backs tests
//! and single-process embeddings.

use super::models::{Event, EventFilter, Tag};
use crate::error::{MeshError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Abstract remote event store
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch events from one hub matching any of the given filters
    async fn fetch_events(&self, hub_id: &str, filters: &[EventFilter]) -> Result<Vec<Event>>;

    /// Publish a tagged event to one hub
    async fn publish_event(&self, hub_id: &str, tags: Vec<Tag>, data: Option<String>)
        -> Result<()>;
}

/// HTTP event store configuration
#[derive(Debug, Clone)]
pub struct HttpEventStoreConfig {
    /// Base URL of the hub gateway; hub IDs are appended as path segments
    pub gateway_url: String,
    pub timeout: Duration,
}

impl Default for HttpEventStoreConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8090".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Event store client speaking JSON over HTTP to hub processes
pub struct HttpEventStore {
    config: HttpEventStoreConfig,
    client: reqwest::Client,
}

impl HttpEventStore {
    pub fn new(config: HttpEventStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MeshError::Internal(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpEventStoreConfig::default())
    }

    fn hub_url(&self, hub_id: &str, action: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.gateway_url.trim_end_matches('/'),
            hub_id,
            action
        )
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn fetch_events(&self, hub_id: &str, filters: &[EventFilter]) -> Result<Vec<Event>> {
        let url = self.hub_url(hub_id, "fetch-events");
        debug!("Fetching events: hub={}, filters={}", hub_id, filters.len());

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "filters": filters }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MeshError::Transport(format!(
                "Hub {} returned status {}",
                hub_id,
                response.status()
            )));
        }

        let raw: Vec<HashMap<String, Value>> = response.json().await.map_err(|e| {
            MeshError::MalformedResponse {
                hub_id: hub_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let events: Vec<Event> = raw.iter().filter_map(Event::from_raw).collect();

        if events.len() < raw.len() {
            warn!(
                "Dropped {} malformed records from hub {}",
                raw.len() - events.len(),
                hub_id
            );
        }

        Ok(events)
    }

    async fn publish_event(
        &self,
        hub_id: &str,
        tags: Vec<Tag>,
        data: Option<String>,
    ) -> Result<()> {
        let url = self.hub_url(hub_id, "event");
        debug!("Publishing event: hub={}, tags={}", hub_id, tags.len());

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "tags": tags, "data": data }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MeshError::Transport(format!(
                "Hub {} rejected event with status {}",
                hub_id,
                response.status()
            )));
        }

        Ok(())
    }
}

/// In-memory event store for tests and single-process embeddings
#[derive(Default)]
pub struct InMemoryEventStore {
    events: DashMap<String, Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a hub with a pre-built event
    pub fn seed(&self, hub_id: &str, event: Event) {
        self.events
            .entry(hub_id.to_string())
            .or_default()
            .push(event);
    }

    fn matches(event: &Event, filter: &EventFilter) -> bool {
        if let Some(kinds) = &filter.kinds {
            if !kinds.iter().any(|k| k == &event.kind) {
                return false;
            }
        }
        if let Some(ids) = &filter.ids {
            if !ids.iter().any(|i| i == &event.id) {
                return false;
            }
        }
        if let Some(tags) = &filter.tags {
            for (name, wanted) in tags {
                let values = event.tag_values(name);
                if !wanted.iter().all(|w| values.iter().any(|v| v == w)) {
                    return false;
                }
            }
        }
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            let in_content = event.content.to_lowercase().contains(&needle);
            let in_tags = event
                .tags
                .values()
                .flatten()
                .any(|v| v.to_lowercase().contains(&needle));
            if !in_content && !in_tags {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch_events(&self, hub_id: &str, filters: &[EventFilter]) -> Result<Vec<Event>> {
        let events = self
            .events
            .get(hub_id)
            .map(|e| e.clone())
            .unwrap_or_default();

        let mut matched: Vec<Event> = events
            .into_iter()
            .filter(|event| filters.iter().any(|f| Self::matches(event, f)))
            .collect();

        if let Some(limit) = filters.iter().filter_map(|f| f.limit).min() {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn publish_event(
        &self,
        hub_id: &str,
        tags: Vec<Tag>,
        data: Option<String>,
    ) -> Result<()> {
        let mut raw: HashMap<String, Value> = HashMap::new();
        raw.insert("Id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        raw.insert("Kind".into(), Value::String(super::models::KIND_AI_MEMORY.into()));
        if let Some(data) = data {
            raw.insert("Content".into(), Value::String(data));
        }

        // Repeatable tags collapse into arrays, mirroring hub behavior
        for tag in tags {
            match raw.get_mut(&tag.name) {
                Some(Value::Array(values)) => values.push(Value::String(tag.value)),
                Some(existing) => {
                    let prior = existing.clone();
                    *existing = Value::Array(vec![prior, Value::String(tag.value)]);
                }
                None => {
                    raw.insert(tag.name, Value::String(tag.value));
                }
            }
        }

        if let Some(event) = Event::from_raw(&raw) {
            self.events
                .entry(hub_id.to_string())
                .or_default()
                .push(event);
        }

        Ok(())
    }
}
