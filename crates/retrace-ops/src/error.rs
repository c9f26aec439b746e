//! Error types for the operation journal
//!
//! Expected reversal failures (divergent edits, missing backups, shell
//! commands) are not represented here: strategies report those as soft
//! results so a single failed cascade step can never poison the journal.

use thiserror::Error;

/// Errors raised by the journal, backup store, and persistence layer
#[derive(Debug, Error)]
pub enum RetraceError {
    /// No operation with the given id exists in the journal
    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    /// The requested status transition is not legal for the operation
    #[error("Invalid status transition for operation {id}: {detail}")]
    InvalidTransition {
        /// Id of the operation being transitioned
        id: String,
        /// Why the transition was refused
        detail: String,
    },

    /// A persisted journal belongs to a different workspace
    #[error("Journal belongs to a different workspace (expected {expected}, found {found})")]
    WorkspaceMismatch {
        /// Identity derived from the current workspace root
        expected: String,
        /// Identity found in the persisted file
        found: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetraceError {
    /// Create a new OperationNotFound error with context
    pub fn operation_not_found(id: impl Into<String>) -> Self {
        Self::OperationNotFound(id.into())
    }

    /// Create a new InvalidTransition error with context
    pub fn invalid_transition(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            detail: detail.into(),
        }
    }

}
