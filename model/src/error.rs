//! Error types for profile items

use thiserror::Error;

/// Item model errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid prefix directive '{0}'")]
    InvalidDirective(char),

    #[error("Invalid context expression '{expr}': {message}")]
    Context { expr: String, message: String },
}

impl ModelError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ModelError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for item model operations
pub type Result<T> = std::result::Result<T, ModelError>;
