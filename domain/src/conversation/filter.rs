//! Conversation filters shared by listing, statistics and export

use super::entities::ConversationRecord;
use crate::core::timestamp;
use crate::session::entities::SessionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exact-match and creation-date filters over conversations.
///
/// The date range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationFilter {
    pub user_type: Option<String>,
    pub session_key: Option<SessionKey>,
    #[serde(default, with = "timestamp::option")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub date_to: Option<DateTime<Utc>>,
}

impl ConversationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn with_session_key(mut self, key: SessionKey) -> Self {
        self.session_key = Some(key);
        self
    }

    pub fn with_date_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, record: &ConversationRecord) -> bool {
        if let Some(user_type) = &self.user_type {
            if record.user_type.as_deref() != Some(user_type.as_str()) {
                return false;
            }
        }
        if let Some(key) = &self.session_key {
            if &record.session_key != key {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::{ConversationId, Turn};
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn record(user_type: Option<&str>, day: u32) -> ConversationRecord {
        let mut rec = ConversationRecord::start(
            ConversationId::generate(),
            SessionKey::new("u1").unwrap(),
            Turn::user("hi", at(day)),
            at(day),
        );
        rec.user_type = user_type.map(str::to_string);
        rec
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ConversationFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&record(None, 1)));
    }

    #[test]
    fn test_user_type_exact_match() {
        let filter = ConversationFilter::new().with_user_type("eco_focused");
        assert!(filter.matches(&record(Some("eco_focused"), 1)));
        assert!(!filter.matches(&record(Some("budget"), 1)));
        assert!(!filter.matches(&record(None, 1)));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = ConversationFilter::new().with_date_range(Some(at(2)), Some(at(4)));
        assert!(!filter.matches(&record(None, 1)));
        assert!(filter.matches(&record(None, 2)));
        assert!(filter.matches(&record(None, 4)));
        assert!(!filter.matches(&record(None, 5)));
    }
}
