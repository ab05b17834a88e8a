//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod conversation_store;
pub mod export_conversations;
pub mod handle_message;
pub mod session_store;
pub mod store_error;
pub mod sweep_sessions;
