//! Typed event model and tag conventions
//!
//! Hubs return flat key-value records where repeatable tags appear either
//! as a scalar or an array. Everything is normalized into a strongly
//! typed [`Event`] at this boundary before core logic touches it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Event kind for workflow memory records
pub const KIND_AI_MEMORY: &str = "AI_MEMORY";

/// Memory category tag (`workflow`, `enhancement`, `context`, ...)
pub const TAG_AI_TYPE: &str = "ai_type";
/// Repeatable visibility/category tag
pub const TAG_AI_TAG: &str = "ai_tag";
pub const TAG_AI_ACCESS_COUNT: &str = "ai_access_count";
pub const TAG_AI_IMPORTANCE: &str = "ai_importance";
pub const TAG_WORKFLOW_ID: &str = "workflow_id";
pub const TAG_WORKFLOW_CAPABILITY: &str = "workflow_capability";
pub const TAG_WORKFLOW_REQUIREMENT: &str = "workflow_requirement";
pub const TAG_WORKFLOW_PERFORMANCE: &str = "workflow_performance";
pub const TAG_WORKFLOW_ENHANCEMENT: &str = "workflow_enhancement";

/// Visibility values workflows need to be cross-hub discoverable
pub const VIS_PUBLIC: &str = "public";
pub const VIS_DISCOVERABLE: &str = "discoverable";
/// Visibility value enhancement patterns need to be peer-fetchable
pub const VIS_SHAREABLE: &str = "shareable";

/// A name/value tag pair as published to a hub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Filter sent to a hub's fetch-events endpoint
///
/// Serialized as one element of a JSON filter array; hubs apply
/// membership matching on `tags` values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl EventFilter {
    /// Filter for memory events of one `ai_type`
    pub fn for_memory_type(ai_type: &str) -> Self {
        let mut tags = HashMap::new();
        tags.insert(TAG_AI_TYPE.to_string(), vec![ai_type.to_string()]);
        Self {
            kinds: Some(vec![KIND_AI_MEMORY.to_string()]),
            tags: Some(tags),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, name: &str, values: Vec<String>) -> Self {
        self.tags
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), values);
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Normalized event record
///
/// All repeatable tags are arrays here regardless of how the hub encoded
/// them on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub tags: HashMap<String, Vec<String>>,
}

impl Event {
    /// Build a normalized event from a flat hub record
    ///
    /// Returns `None` when the record carries no usable identifier.
    pub fn from_raw(raw: &HashMap<String, Value>) -> Option<Self> {
        let id = string_field(raw, TAG_WORKFLOW_ID)
            .or_else(|| string_field(raw, "Id"))
            .or_else(|| string_field(raw, "id"))?;

        let kind = string_field(raw, "Kind")
            .or_else(|| string_field(raw, "kind"))
            .unwrap_or_else(|| KIND_AI_MEMORY.to_string());

        let content = string_field(raw, "Content")
            .or_else(|| string_field(raw, "content"))
            .unwrap_or_default();

        let created_at = raw
            .get("Timestamp")
            .or_else(|| raw.get("timestamp"))
            .and_then(timestamp_millis)
            .or_else(|| {
                string_field(raw, "created_at")
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
            });

        let mut tags = HashMap::new();
        for (key, value) in raw {
            match key.as_str() {
                "Id" | "id" | "Kind" | "kind" | "Content" | "content" | "Timestamp"
                | "timestamp" | "created_at" => continue,
                _ => {
                    tags.insert(key.clone(), normalize_tag_value(value));
                }
            }
        }

        Some(Self {
            id,
            kind,
            content,
            created_at,
            tags,
        })
    }

    /// First value of a tag, if present
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a tag (empty when absent)
    pub fn tag_values(&self, name: &str) -> &[String] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether every listed visibility value is present in `ai_tag`
    pub fn has_visibility(&self, required: &[&str]) -> bool {
        let values = self.tag_values(TAG_AI_TAG);
        required.iter().all(|r| values.iter().any(|v| v == r))
    }
}

/// Normalize a scalar-or-array tag value into an array of strings
pub fn normalize_tag_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(raw: &HashMap<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(scalar_to_string)
}

/// Parse a millisecond epoch that may arrive as a number or a string
fn timestamp_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }?;
    DateTime::from_timestamp_millis(millis)
}
