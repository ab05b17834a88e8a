//! Session store.
//!
//! Owns the lifetime of [`Session`]s: creation, lookup with lazy expiry,
//! shallow-merge updates, deletion and the periodic sweep. Sessions live in
//! the `sessions` collection keyed by their [`SessionKey`].
//!
//! Expiry is evaluated against the injected [`Clock`] on every read, so an
//! expired session is never returned even if no sweep has run.

use crate::config::store_settings::DEFAULT_SESSION_TTL;
use crate::ports::clock::{Clock, SystemClock};
use crate::ports::storage_backend::{Direction, Query, StorageBackend};
use crate::use_cases::store_error::StoreError;
use chrono::Duration;
use crs_domain::{Session, SessionKey, SessionState, timestamp};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collection holding session documents.
pub const SESSIONS: &str = "sessions";

pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            clock: self.clock.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            default_ttl: Duration::seconds(DEFAULT_SESSION_TTL.as_secs() as i64),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Create a session with the default TTL.
    ///
    /// Fails with [`StoreError::DuplicateSession`] if a live session already
    /// holds `key`. An expired one is replaced.
    pub async fn create_session(
        &self,
        key: &SessionKey,
        initial_state: SessionState,
    ) -> Result<Session, StoreError> {
        self.create_session_with_ttl(key, initial_state, self.default_ttl)
            .await
    }

    pub async fn create_session_with_ttl(
        &self,
        key: &SessionKey,
        initial_state: SessionState,
        ttl: Duration,
    ) -> Result<Session, StoreError> {
        let now = self.clock.now();
        if let Some(existing) = self.load(key).await? {
            if !existing.is_expired(now) {
                return Err(StoreError::DuplicateSession(key.to_string()));
            }
            debug!(session = %key, "Replacing expired session");
        }
        let session = Session::new(key.clone(), initial_state, now, ttl);
        self.save(&session).await?;
        debug!(session = %key, ttl_secs = session.ttl_secs, "Created session");
        Ok(session)
    }

    /// Overwrite whatever is stored under `key` with a fresh session.
    pub async fn replace_session(
        &self,
        key: &SessionKey,
        initial_state: SessionState,
    ) -> Result<Session, StoreError> {
        let session = Session::new(key.clone(), initial_state, self.clock.now(), self.default_ttl);
        self.save(&session).await?;
        debug!(session = %key, "Replaced session");
        Ok(session)
    }

    /// Fetch a live session.
    ///
    /// An expired session is deleted on the way out and reported as
    /// not found. A backend fault during that delete is returned.
    pub async fn get_session(&self, key: &SessionKey) -> Result<Session, StoreError> {
        let session = self
            .load(key)
            .await?
            .ok_or_else(|| StoreError::session_not_found(key.as_str()))?;

        if session.is_expired(self.clock.now()) {
            debug!(session = %key, "Session expired, removing");
            self.backend.delete(SESSIONS, key.as_str()).await?;
            return Err(StoreError::session_not_found(key.as_str()));
        }
        Ok(session)
    }

    /// Shallow-merge `patch` into the session state and refresh its activity.
    pub async fn update_session(
        &self,
        key: &SessionKey,
        patch: SessionState,
    ) -> Result<Session, StoreError> {
        let mut session = match self.get_session(key).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => {
                return Err(StoreError::SessionNotFound(key.to_string()));
            }
            Err(e) => return Err(e),
        };
        session.apply_patch(patch, self.clock.now());
        self.save(&session).await?;
        Ok(session)
    }

    /// Remove a session. Removing an absent session succeeds.
    pub async fn delete_session(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.backend.delete(SESSIONS, key.as_str()).await?;
        debug!(session = %key, "Deleted session");
        Ok(())
    }

    /// Delete every expired session, returning how many were removed.
    ///
    /// Undecodable documents are skipped with a warning so one bad record
    /// cannot stall the sweep.
    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let query = Query::new()
            .where_range(
                "expires_at",
                None,
                Some(Value::String(timestamp::format(&now))),
            )
            .order_by("expires_at", Direction::Ascending);

        let candidates = self.backend.query(SESSIONS, &query).await?;
        let mut removed = 0;
        for doc in candidates {
            match serde_json::from_value::<Session>(doc.value) {
                Ok(session) if session.is_expired(now) => {
                    self.backend.delete(SESSIONS, &doc.key).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(key = %doc.key, error = %e, "Skipping undecodable session"),
            }
        }
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    async fn load(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let Some(value) = self.backend.get(SESSIONS, key.as_str()).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let value = serde_json::to_value(session).map_err(|e| StoreError::Corrupt {
            key: session.key.to_string(),
            reason: e.to_string(),
        })?;
        self.backend
            .put(SESSIONS, session.key.as_str(), value)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use crate::test_support::MockBackend;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn setup() -> (Arc<MockBackend>, Arc<ManualClock>, SessionStore) {
        let backend = Arc::new(MockBackend::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = SessionStore::new(backend.clone()).with_clock(clock.clone());
        (backend, clock, store)
    }

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s).unwrap()
    }

    fn state(field: &str, value: Value) -> SessionState {
        let mut state = SessionState::new();
        state.insert(field.to_string(), value);
        state
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (_, _, store) = setup();
        let created = store
            .create_session(&key("u1"), state("stage", json!("greeting")))
            .await
            .unwrap();
        let fetched = store.get_session(&key("u1")).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_duplicate_live_session_rejected() {
        let (_, _, store) = setup();
        store
            .create_session(&key("u1"), SessionState::new())
            .await
            .unwrap();
        let err = store
            .create_session(&key("u1"), SessionState::new())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateSession("u1".into()));
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced_on_create() {
        let (_, clock, store) = setup();
        store
            .create_session_with_ttl(&key("u1"), state("v", json!(1)), Duration::seconds(5))
            .await
            .unwrap();
        clock.advance(Duration::seconds(6));
        let fresh = store
            .create_session(&key("u1"), state("v", json!(2)))
            .await
            .unwrap();
        assert_eq!(fresh.state["v"], json!(2));
    }

    #[tokio::test]
    async fn test_ttl_expiry_without_sweep() {
        let (backend, clock, store) = setup();
        store
            .create_session_with_ttl(&key("u1"), SessionState::new(), Duration::seconds(5))
            .await
            .unwrap();

        clock.advance(Duration::seconds(10));
        let err = store.get_session(&key("u1")).await.unwrap_err();
        assert!(err.is_not_found());
        // lazily removed
        assert!(backend.raw(SESSIONS, "u1").is_none());
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_expiry() {
        let (_, clock, store) = setup();
        store
            .create_session_with_ttl(
                &key("u1"),
                state("slots", json!({"budget": "low"})),
                Duration::seconds(5),
            )
            .await
            .unwrap();

        clock.advance(Duration::seconds(4));
        let updated = store
            .update_session(&key("u1"), state("last_intent", json!("find_destination")))
            .await
            .unwrap();
        assert_eq!(updated.state["slots"], json!({"budget": "low"}));
        assert_eq!(updated.state_str("last_intent"), Some("find_destination"));

        // 8s after creation but only 4s after the update
        clock.advance(Duration::seconds(4));
        assert!(store.get_session(&key("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let (_, _, store) = setup();
        let err = store
            .update_session(&key("ghost"), SessionState::new())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::SessionNotFound("ghost".into()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_, _, store) = setup();
        store
            .create_session(&key("u1"), SessionState::new())
            .await
            .unwrap();
        store.delete_session(&key("u1")).await.unwrap();
        store.delete_session(&key("u1")).await.unwrap();
        assert!(store.get_session(&key("u1")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (backend, clock, store) = setup();
        store
            .create_session_with_ttl(&key("short"), SessionState::new(), Duration::seconds(5))
            .await
            .unwrap();
        store
            .create_session_with_ttl(&key("long"), SessionState::new(), Duration::seconds(60))
            .await
            .unwrap();

        clock.advance(Duration::seconds(10));
        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(backend.raw(SESSIONS, "short").is_none());
        assert!(backend.raw(SESSIONS, "long").is_some());
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversized_default_ttl_is_clamped() {
        let (backend, _, store) = setup();
        let huge = Duration::from_std(std::time::Duration::from_secs(10_000_000_000_000)).unwrap();
        let store = store.with_default_ttl(huge);
        let session = store
            .create_session(&key("u1"), SessionState::new())
            .await
            .unwrap();
        assert_eq!(session.ttl_secs, crs_domain::MAX_TTL_SECS);
        assert!(backend.raw(SESSIONS, "u1").is_some());
        assert!(store.get_session(&key("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_backend_fault_is_not_absence() {
        let (backend, _, store) = setup();
        backend.go_offline();
        let err = store.get_session(&key("u1")).await.unwrap_err();
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_corrupt_document_reported() {
        let (backend, _, store) = setup();
        backend.insert_raw(SESSIONS, "u1", json!({"key": "u1", "state": 7}));
        let err = store.get_session(&key("u1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
