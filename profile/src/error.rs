//! Error types for the profile merge engine

use buckos_config::ConfigError;
use buckos_model::ModelError;
use thiserror::Error;

/// Result type alias for profile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Profile merge errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed item, invalid directive, or a context expression that
    /// failed to evaluate
    #[error("Invalid item: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Two definitions of the same key and no rule deciding between them
    #[error("Conflicting {kind} definitions for '{key}': {existing} vs {candidate}")]
    Conflict {
        kind: &'static str,
        key: String,
        existing: String,
        candidate: String,
    },

    #[error("Cannot merge {candidate}: version of '{key}' is pinned by {existing}")]
    Pinned {
        key: String,
        existing: String,
        candidate: String,
    },

    /// Probing found no usable bucket; the resize policy was not honored
    #[error("No free bucket for '{key}' in a table of {buckets} buckets")]
    Capacity { key: String, buckets: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Error::Pinned { .. })
    }
}
