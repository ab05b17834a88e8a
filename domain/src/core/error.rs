//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(String),

    #[error("Invalid page token")]
    InvalidPageToken,

    #[error("Unknown export format: {0} (expected jsonl, qa_pairs, chatml or full)")]
    UnknownExportFormat(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

impl DomainError {
    /// Check if this error was caused by caller-supplied identifiers
    pub fn is_invalid_identifier(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidSessionKey(_) | DomainError::InvalidConversationId(_)
        )
    }
}
