//! Error types shared across the graph-search subsystem.

use thiserror::Error;

/// Unified error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed identifier key string
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
