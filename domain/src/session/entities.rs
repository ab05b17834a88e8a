//! Session entities

use crate::core::error::DomainError;
use crate::core::timestamp;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Longest accepted session TTL (ten years). Longer requests are clamped.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Arbitrary per-session state fields (last intent, clarification slots, ...).
pub type SessionState = Map<String, Value>;

/// Opaque key identifying a chat session (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Create a key, rejecting empty or whitespace-only input.
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::InvalidSessionKey(key));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionKey::new(s)
    }
}

/// A keyed chat session with a time-to-live.
///
/// `expires_at` is always `last_activity + ttl`; it is stored alongside the
/// other fields so backends can range-query expired sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    #[serde(default)]
    pub state: SessionState,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_activity: DateTime<Utc>,
    pub ttl_secs: u64,
    #[serde(with = "timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey, state: SessionState, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl_secs = (ttl.num_seconds().max(0) as u64).min(MAX_TTL_SECS);
        let mut session = Self {
            key,
            state,
            created_at: now,
            last_activity: now,
            ttl_secs,
            expires_at: now,
        };
        session.expires_at = session.expiry();
        session
    }

    /// The TTL, capped at [`MAX_TTL_SECS`] even for documents written with more.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.min(MAX_TTL_SECS) as i64)
    }

    /// A session is expired once `last_activity + ttl < now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry() < now
    }

    /// `last_activity + ttl`, saturating at the largest representable time.
    fn expiry(&self) -> DateTime<Utc> {
        self.last_activity
            .checked_add_signed(self.ttl())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Shallow-merge `patch` into the state and refresh activity.
    pub fn apply_patch(&mut self, patch: SessionState, now: DateTime<Utc>) {
        for (field, value) in patch {
            self.state.insert(field, value);
        }
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.expires_at = self.expiry();
    }

    /// Read a string field from the state.
    pub fn state_str(&self, field: &str) -> Option<&str> {
        self.state.get(field).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_session_key_rejects_blank() {
        assert!(SessionKey::new("").is_err());
        assert!(SessionKey::new("   ").is_err());
        assert_eq!(SessionKey::new("u1").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_expiry_boundary() {
        let session = Session::new(
            SessionKey::new("u1").unwrap(),
            SessionState::new(),
            t0(),
            Duration::seconds(5),
        );
        assert!(!session.is_expired(t0() + Duration::seconds(5)));
        assert!(session.is_expired(t0() + Duration::seconds(10)));
    }

    #[test]
    fn test_apply_patch_merges_and_refreshes() {
        let mut state = SessionState::new();
        state.insert("last_intent".into(), json!("greet"));
        state.insert("slots".into(), json!({"budget": "low"}));
        let mut session = Session::new(
            SessionKey::new("u1").unwrap(),
            state,
            t0(),
            Duration::seconds(60),
        );

        let mut patch = SessionState::new();
        patch.insert("last_intent".into(), json!("find_destination"));
        session.apply_patch(patch, t0() + Duration::seconds(30));

        assert_eq!(session.state_str("last_intent"), Some("find_destination"));
        assert_eq!(session.state["slots"], json!({"budget": "low"}));
        assert_eq!(session.last_activity, t0() + Duration::seconds(30));
        assert_eq!(session.expires_at, t0() + Duration::seconds(90));
        assert_eq!(session.created_at, t0());
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let mut session = Session::new(
            SessionKey::new("u1").unwrap(),
            SessionState::new(),
            t0(),
            Duration::seconds(10_000_000_000_000),
        );
        assert_eq!(session.ttl_secs, MAX_TTL_SECS);
        assert_eq!(session.expires_at, t0() + Duration::seconds(MAX_TTL_SECS as i64));
        assert!(!session.is_expired(t0() + Duration::days(365)));

        session.touch(t0() + Duration::seconds(1));
        assert_eq!(
            session.expires_at,
            t0() + Duration::seconds(1 + MAX_TTL_SECS as i64)
        );
    }

    #[test]
    fn test_stored_oversized_ttl_does_not_overflow() {
        let mut session = Session::new(
            SessionKey::new("u1").unwrap(),
            SessionState::new(),
            t0(),
            Duration::seconds(60),
        );
        session.ttl_secs = u64::MAX;
        assert_eq!(session.ttl(), Duration::seconds(MAX_TTL_SECS as i64));
        assert!(!session.is_expired(t0() + Duration::days(1)));
    }

    #[test]
    fn test_serialized_shape() {
        let session = Session::new(
            SessionKey::new("u1").unwrap(),
            SessionState::new(),
            t0(),
            Duration::seconds(3600),
        );
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["key"], "u1");
        assert_eq!(value["expires_at"], "2024-01-01T01:00:00.000000Z");
        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }
}
