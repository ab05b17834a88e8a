//! Domain layer for crs-store
//!
//! This crate contains the entities, value objects and pure functions of the
//! conversational recommender's storage core. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Sessions
//!
//! A [`Session`] is keyed chat state with a time-to-live. Expired sessions are
//! never observable, whether or not they were physically removed yet.
//!
//! ## Conversations
//!
//! A [`ConversationRecord`] is an append-only sequence of [`Turn`]s owned by
//! one session, optionally classified with a user type.
//!
//! ## Export
//!
//! The [`export`] module turns records into JSONL, Q&A pairs, ChatML
//! transcripts or a full analysis dump.

pub mod conversation;
pub mod core;
pub mod export;
pub mod session;

// Re-export commonly used types
pub use conversation::{
    entities::{ConversationId, ConversationRecord, Role, Turn},
    filter::ConversationFilter,
    page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageToken, clamp_page_size},
    statistics::{ConversationStatistics, DateRange, UNKNOWN_USER_TYPE},
};
pub use core::{error::DomainError, timestamp};
pub use export::{ExportFormat, ExportOptions, QaPair, Transcript, render_lines};
pub use session::entities::{MAX_TTL_SECS, Session, SessionKey, SessionState};
