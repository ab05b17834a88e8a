//! Conversation entities

use crate::core::error::DomainError;
use crate::core::timestamp;
use crate::session::entities::SessionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique conversation identifier (Value Object)
///
/// Generated ids are random v4 UUIDs in simple (hyphen-less) form and are
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing id (e.g. read back from storage or the CLI).
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidConversationId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversationId::new(s)
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "agent" | "assistant" => Ok(Role::Agent),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// One message in a conversation.
///
/// `seq` is the insertion position and is assigned by the conversation
/// store when the turn is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub seq: u32,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
            seq: 0,
            metadata: Map::new(),
        }
    }

    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, text, timestamp)
    }

    pub fn agent(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Agent, text, timestamp)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Detected intent recorded on the turn, if any.
    pub fn intent(&self) -> Option<&str> {
        self.metadata.get("intent").and_then(Value::as_str)
    }
}

/// A stored conversation: append-only turns owned by one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: ConversationId,
    pub session_key: SessionKey,
    pub turns: Vec<Turn>,
    pub user_type: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Start a conversation with exactly one turn.
    pub fn start(
        conversation_id: ConversationId,
        session_key: SessionKey,
        initial_turn: Turn,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            conversation_id,
            session_key,
            turns: Vec::with_capacity(4),
            user_type: None,
            created_at: now,
            updated_at: now,
        };
        record.push_turn(initial_turn, now);
        record
    }

    /// Append a turn at the next insertion position.
    pub fn push_turn(&mut self, mut turn: Turn, now: DateTime<Utc>) {
        turn.seq = self.turns.len() as u32;
        self.turns.push(turn);
        self.updated_at = now;
    }

    pub fn set_user_type(&mut self, user_type: impl Into<String>, now: DateTime<Utc>) {
        self.user_type = Some(user_type.into());
        self.updated_at = now;
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// The last `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn record() -> ConversationRecord {
        ConversationRecord::start(
            ConversationId::new("c1").unwrap(),
            SessionKey::new("u1").unwrap(),
            Turn::user("hello", t(0)),
            t(0),
        )
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_role_parse_accepts_assistant_alias() {
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Agent);
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn test_push_turn_assigns_positions() {
        let mut rec = record();
        rec.push_turn(Turn::agent("hi there", t(1)), t(1));
        rec.push_turn(Turn::user("eco hotels?", t(2)), t(2));

        let seqs: Vec<u32> = rec.turns.iter().map(|turn| turn.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(rec.updated_at, t(2));
        assert_eq!(rec.created_at, t(0));
    }

    #[test]
    fn test_recent_turns() {
        let mut rec = record();
        rec.push_turn(Turn::agent("a", t(1)), t(1));
        rec.push_turn(Turn::user("b", t(2)), t(2));
        let recent: Vec<&str> = rec.recent_turns(2).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(recent, vec!["a", "b"]);
        assert_eq!(rec.recent_turns(10).len(), 3);
    }

    #[test]
    fn test_metadata_skipped_when_empty() {
        let value = serde_json::to_value(Turn::user("x", t(0))).unwrap();
        assert!(value.get("metadata").is_none());
        let tagged = Turn::agent("y", t(0)).with_metadata("intent", "find_destination");
        assert_eq!(tagged.intent(), Some("find_destination"));
    }
}
