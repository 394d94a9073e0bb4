//! Common error types used across all Chart Notes crates
//! Provides consistent error handling and reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for all Chart Notes operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum ChartNotesError {
    /// A required field is missing or holds an unusable value
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The operation referenced an id absent from the store
    #[error("Data point not found: {id}")]
    NotFound { id: i64 },

    /// The backend could not be reached or answered with a failure
    #[error("Backend request failed: {message}")]
    Transport { message: String },

    /// A chart was requested for zero points
    #[error("Cannot build a chart scale from an empty point sequence")]
    EmptyDomain,

    /// The local durable slot could not be read or written
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

/// Result type alias for Chart Notes operations
pub type ChartNotesResult<T> = Result<T, ChartNotesError>;

impl ChartNotesError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ChartNotesError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ChartNotesError::Transport {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ChartNotesError::Storage {
            message: message.into(),
        }
    }

    /// Whether a caller is at fault (as opposed to the backend)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChartNotesError::Validation { .. } | ChartNotesError::NotFound { .. }
        )
    }
}

/// Error body returned by the HTTP surface
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &ChartNotesError) -> Self {
        Self {
            error: error.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"error":"Failed to serialize error"}"#.to_string())
    }
}

impl From<serde_json::Error> for ChartNotesError {
    fn from(err: serde_json::Error) -> Self {
        ChartNotesError::Storage {
            message: format!("JSON error at line {}: {}", err.line(), err),
        }
    }
}

impl From<std::io::Error> for ChartNotesError {
    fn from(err: std::io::Error) -> Self {
        ChartNotesError::Storage {
            message: err.to_string(),
        }
    }
}
