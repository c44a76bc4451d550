//! Error types for the workflow mesh

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors produced by the workflow mesh
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Hub {hub_id} returned a malformed response: {reason}")]
    MalformedResponse { hub_id: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for MeshError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MeshError::Timeout(0)
        } else {
            MeshError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(e: serde_json::Error) -> Self {
        MeshError::MalformedResponse {
            hub_id: String::new(),
            reason: e.to_string(),
        }
    }
}
