//! Periodic expired-session sweep.
//!
//! Lookups already hide expired sessions; the sweep only reclaims their
//! storage. It runs on a fixed interval until its [`CancellationToken`] fires.

use crate::use_cases::session_store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SweepSessionsUseCase {
    sessions: Arc<SessionStore>,
}

impl SweepSessionsUseCase {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// Sweep every `interval` until `cancellation` fires. A failed sweep is
    /// logged and retried on the next tick.
    pub async fn run(&self, interval: Duration, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "Session sweep started");

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    debug!("Session sweep cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sessions.sweep_expired().await {
                        Ok(removed) => debug!(removed, "Sweep finished"),
                        Err(e) => warn!(error = %e, "Session sweep failed"),
                    }
                }
            }
        }
    }

    /// Run the periodic sweep on its own task.
    pub fn spawn(self, interval: Duration, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(interval, cancellation).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::ManualClock;
    use crate::test_support::MockBackend;
    use crate::use_cases::session_store::SESSIONS;
    use chrono::{TimeZone, Utc};
    use crs_domain::{SessionKey, SessionState};

    #[tokio::test]
    async fn test_first_tick_sweeps_and_cancel_stops() {
        let backend = Arc::new(MockBackend::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let sessions = Arc::new(SessionStore::new(backend.clone()).with_clock(clock.clone()));
        sessions
            .create_session_with_ttl(
                &SessionKey::new("old").unwrap(),
                SessionState::new(),
                chrono::Duration::seconds(1),
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(5));

        let token = CancellationToken::new();
        let handle = SweepSessionsUseCase::new(sessions).spawn(Duration::from_secs(3600), token.clone());

        // the interval's first tick completes immediately
        for _ in 0..50 {
            if backend.len(SESSIONS) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(backend.len(SESSIONS), 0);

        token.cancel();
        handle.await.unwrap();
    }
}
