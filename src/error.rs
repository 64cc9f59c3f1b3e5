//! Error types for ensemble-core.

use thiserror::Error;

/// Result type alias using ensemble-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during ensemble orchestration.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid catalog or preset configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Assignment planning failed
    #[error("Planning error: {0}")]
    Planning(String),

    /// Pane capture failed
    #[error("Capture error for {pane}: {message}")]
    Capture { pane: String, message: String },

    /// Structured output failed schema validation
    #[error("Validation error for mode {mode_id}: {message}")]
    Validation { mode_id: String, message: String },

    /// Token budget exhausted
    #[error("Budget exhausted: {0}")]
    BudgetExhausted(String),

    /// Synthesis could not produce a result
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Unknown synthesis strategy name
    #[error("Unknown synthesis strategy: {0}")]
    UnknownStrategy(String),

    /// Session missing from the store; callers branch on this
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session store I/O or serialization failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation timed out
    #[error("Operation timed out after {duration_ms}ms: {scope}")]
    Timeout { scope: String, duration_ms: u64 },

    /// Operation cancelled by the caller
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a planning error.
    pub fn planning(message: impl Into<String>) -> Self {
        Self::Planning(message.into())
    }

    /// Create a capture error attributed to a pane.
    pub fn capture(pane: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capture {
            pane: pane.into(),
            message: message.into(),
        }
    }

    /// Create a validation error attributed to a mode.
    pub fn validation(mode_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            mode_id: mode_id.into(),
            message: message.into(),
        }
    }

    /// Create a synthesis error.
    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a timeout error.
    pub fn timeout(scope: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            scope: scope.into(),
            duration_ms,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    /// True if this error is the session-not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }

    /// True if this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
