//! Cursor-based pagination over conversations.
//!
//! Conversations are listed by `(created_at, conversation_id)` descending.
//! A [`PageToken`] captures the sort key of the last item handed out, so
//! records inserted later sort before the cursor and never shift pages
//! that were already issued.

use super::entities::{ConversationId, ConversationRecord};
use crate::core::error::DomainError;
use crate::core::timestamp;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on a requested page size.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Clamp a requested page size; zero selects the default.
pub fn clamp_page_size(requested: usize) -> usize {
    match requested {
        0 => DEFAULT_PAGE_SIZE,
        n => n.min(MAX_PAGE_SIZE),
    }
}

/// Opaque continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    #[serde(rename = "c", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "i")]
    pub conversation_id: ConversationId,
}

impl PageToken {
    pub fn after(record: &ConversationRecord) -> Self {
        Self {
            created_at: record.created_at,
            conversation_id: record.conversation_id.clone(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, DomainError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| DomainError::InvalidPageToken)?;
        serde_json::from_slice(&bytes).map_err(|_| DomainError::InvalidPageToken)
    }
}

impl std::fmt::Display for PageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// One page of results plus the token for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_token_roundtrip() {
        let token = PageToken {
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            conversation_id: ConversationId::new("abc").unwrap(),
        };
        let encoded = token.encode();
        assert!(!encoded.contains('='));
        assert_eq!(PageToken::decode(&encoded).unwrap(), token);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert_eq!(
            PageToken::decode("not a token!"),
            Err(DomainError::InvalidPageToken)
        );
        let valid_base64_bad_json = URL_SAFE_NO_PAD.encode(b"{\"x\":1}");
        assert!(PageToken::decode(&valid_base64_bad_json).is_err());
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(0), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(2), 2);
        assert_eq!(clamp_page_size(50_000), MAX_PAGE_SIZE);
    }
}
