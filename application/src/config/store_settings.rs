//! Store settings. Runtime knobs for the session and conversation stores.
//!
//! These are application-layer concerns resolved from the file/env
//! configuration at startup and passed to the use cases by value.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default session time-to-live (one hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Default number of turns handed to the responder as context.
pub const DEFAULT_MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// TTL applied to newly created sessions.
    pub session_ttl: Duration,
    /// Period of the background expiry sweep. `None` disables it.
    pub sweep_interval: Option<Duration>,
    /// Maximum conversation turns passed to the responder.
    pub max_history: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: Some(Duration::from_secs(300)),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl StoreSettings {
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval.filter(|d| !d.is_zero());
        self
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    /// TTL as a chrono duration for timestamp arithmetic.
    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::MAX)
    }
}
