//! Errors shared by the session and conversation stores.

use crate::ports::storage_backend::StorageError;
use crs_domain::DomainError;
use thiserror::Error;

/// Which kind of record a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Session,
    Conversation,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Session => write!(f, "Session"),
            RecordKind::Conversation => write!(f, "Conversation"),
        }
    }
}

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid page token")]
    InvalidPageToken,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub fn session_not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Session,
            key: key.into(),
        }
    }

    pub fn conversation_not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Conversation,
            key: key.into(),
        }
    }

    /// Absence of the addressed record, under any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::SessionNotFound(_)
                | StoreError::ConversationNotFound(_)
        )
    }

    /// Failures that may succeed if the caller tries again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable(_))
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MalformedKey(key) => StoreError::InvalidKey(key),
            StorageError::InvalidQuery(msg) => StoreError::InvalidQuery(msg),
            StorageError::Unavailable(msg) => StoreError::BackendUnavailable(msg),
            StorageError::Corrupt { key, reason } => StoreError::Corrupt { key, reason },
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidPageToken => StoreError::InvalidPageToken,
            DomainError::InvalidSessionKey(key) | DomainError::InvalidConversationId(key) => {
                StoreError::InvalidKey(key)
            }
            other => StoreError::InvalidQuery(other.to_string()),
        }
    }
}
