//! Application layer for crs-store
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::StoreSettings;
pub use ports::{
    agent_responder::{AgentReply, AgentResponder, ResponderError, ResponderRequest},
    clock::{Clock, ManualClock, SystemClock},
    storage_backend::{Direction, Document, Query, StorageBackend, StorageError},
};
pub use use_cases::conversation_store::{CONVERSATIONS, ConversationStore};
pub use use_cases::export_conversations::{
    DEFAULT_EXPORT_LIMIT, ExportConversationsUseCase, ExportInput, ExportOutput,
};
pub use use_cases::handle_message::{ChatReply, HandleMessageError, HandleMessageUseCase};
pub use use_cases::session_store::{SESSIONS, SessionStore};
pub use use_cases::store_error::{RecordKind, StoreError};
pub use use_cases::sweep_sessions::SweepSessionsUseCase;
