//! Error types for the stride_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stride_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced user or stats row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Malformed input, rejected before any engine logic runs
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The store could not serialize a counter update in time
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state document is unreadable
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    pub(crate) fn user_not_found(id: Uuid) -> Self {
        Error::NotFound { entity: "user", id }
    }

    pub(crate) fn stats_not_found(id: Uuid) -> Self {
        Error::NotFound {
            entity: "user stats",
            id,
        }
    }

    /// Whether retrying the whole event once may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict(_))
    }
}
