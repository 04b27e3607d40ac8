//! Error types for evorun
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while driving a run
#[derive(Debug, Error)]
pub enum EvorunError {
    /// A parameter required by the selected run mode is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine reported a failure it cannot recover from
    #[error("Engine error: {0}")]
    Engine(String),

    /// A checkpoint or result file could not be interpreted
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// One-time process setup failed
    #[error("Setup error: {0}")]
    Setup(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for evorun operations
pub type Result<T> = std::result::Result<T, EvorunError>;
