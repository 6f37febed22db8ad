//! Error types for configuration operations

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unknown merge rule: {0}")]
    UnknownRule(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("Invalid context: {0}")]
    Context(#[from] buckos_model::ModelError),
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
