//! Error types for change tracking.

use crate::model::FieldError;
use crate::types::{EventKind, Sequence};
use thiserror::Error;

/// Main error type for change tracking operations.
#[derive(Debug, Error)]
pub enum ChangesError {
    /// A state query ran before any snapshot was captured.
    #[error("Snapshot history is empty")]
    EmptyHistory,

    #[error("Out of order event: got {got:?} after {last:?}")]
    OutOfOrderEvent { last: Sequence, got: Sequence },

    #[error("Invalid event: {0:?} cannot be recorded after construction")]
    InvalidEvent(EventKind),

    /// Failure reported by the model's field reader or constructor.
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Model already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Model not registered: {0}")]
    NotRegistered(String),

    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ChangesError {
    fn from(e: serde_json::Error) -> Self {
        ChangesError::Serialization(e.to_string())
    }
}

/// Result type for change tracking operations.
pub type Result<T> = std::result::Result<T, ChangesError>;
