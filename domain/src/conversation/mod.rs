//! Conversation domain.
//!
//! - [`entities::ConversationRecord`]: append-only turns owned by a session
//! - [`filter::ConversationFilter`]: exact-match and date-range filters
//! - [`page::PageToken`]: opaque cursor for stable pagination
//! - [`statistics::ConversationStatistics`]: aggregation over a filtered set

pub mod entities;
pub mod filter;
pub mod page;
pub mod statistics;
