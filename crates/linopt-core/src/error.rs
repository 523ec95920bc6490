//! Error types for the linear-options engine

use thiserror::Error;

/// Core error type for engine operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Invalid primitive action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Mismatched feature or parameter dimensions
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Dimension actually found
        actual: usize,
    },

    /// No option may be initiated in the current state
    #[error("No eligible option in the current state")]
    NoEligibleOption,

    /// A non-finite value reached a feature vector or learned parameter
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    /// Persisted data does not match the configured library shape
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RLError>;
