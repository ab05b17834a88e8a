//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional; missing keys take the defaults below.
//!
//! ```toml
//! [storage]
//! backend = "document_store"
//! credentials = "sqlite://data/crs.sqlite3"
//! project_id = "tourism-prod"
//!
//! [session]
//! timeout_secs = 3600
//! sweep_interval_secs = 300
//!
//! [conversation]
//! max_history = 20
//! ```

use crs_application::StoreSettings;
use crs_domain::MAX_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("storage.backend = \"document_store\" requires storage.credentials (DATABASE_URL)")]
    MissingCredentials,

    #[error("storage.project_id cannot be empty")]
    EmptyProjectId,

    #[error("session.timeout_secs cannot be 0")]
    InvalidSessionTimeout,

    #[error("session.timeout_secs exceeds the maximum of {max} seconds: {value}")]
    SessionTimeoutTooLarge { value: u64, max: u64 },

    #[error("storage.max_connections cannot be 0")]
    InvalidMaxConnections,

    #[error("server.bind is not a socket address: {0}")]
    InvalidBindAddress(String),

    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
}

/// Which storage backend to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    #[serde(alias = "memory")]
    InMemory,
    #[serde(alias = "firestore")]
    DocumentStore,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::InMemory => "in_memory",
            BackendKind::DocumentStore => "document_store",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "in_memory" | "memory" => Ok(BackendKind::InMemory),
            "document_store" | "firestore" => Ok(BackendKind::DocumentStore),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Raw storage configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub backend: BackendKind,
    /// Connection string or database path of the durable backend
    pub credentials: Option<String>,
    /// Namespace for every durable collection
    pub project_id: String,
    pub max_connections: u32,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::InMemory,
            credentials: None,
            project_id: "default".to_string(),
            max_connections: 5,
        }
    }
}

/// Raw session configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Default session TTL in seconds
    pub timeout_secs: u64,
    /// Period of the expiry sweep in `serve` mode; 0 disables it
    pub sweep_interval_secs: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

/// Raw conversation configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConversationConfig {
    /// Turns of history handed to the responder
    pub max_history: usize,
}

impl Default for FileConversationConfig {
    fn default() -> Self {
        Self { max_history: 20 }
    }
}

/// Raw server configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub bind: String,
    /// Probe the backend on every health request
    pub check_backend: bool,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            check_backend: true,
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Also write logs to this file
    pub file: Option<String>,
}

/// Raw export configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExportConfig {
    /// System block prepended to ChatML transcripts
    pub chatml_system_prompt: Option<String>,
}

/// Complete configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub storage: FileStorageConfig,
    pub session: FileSessionConfig,
    pub conversation: FileConversationConfig,
    pub server: FileServerConfig,
    pub logging: FileLoggingConfig,
    pub export: FileExportConfig,
}

impl FileConfig {
    /// Check the configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut problems = Vec::new();

        if self.storage.backend == BackendKind::DocumentStore
            && self
                .storage
                .credentials
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            problems.push(ConfigError::MissingCredentials);
        }
        if self.storage.project_id.trim().is_empty() {
            problems.push(ConfigError::EmptyProjectId);
        }
        if self.storage.max_connections == 0 {
            problems.push(ConfigError::InvalidMaxConnections);
        }
        if self.session.timeout_secs == 0 {
            problems.push(ConfigError::InvalidSessionTimeout);
        } else if self.session.timeout_secs > MAX_TTL_SECS {
            problems.push(ConfigError::SessionTimeoutTooLarge {
                value: self.session.timeout_secs,
                max: MAX_TTL_SECS,
            });
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            problems.push(ConfigError::InvalidBindAddress(self.server.bind.clone()));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Runtime settings for the stores and message handler.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings::default()
            .with_session_ttl(Duration::from_secs(self.session.timeout_secs))
            .with_sweep_interval(Some(Duration::from_secs(self.session.sweep_interval_secs)))
            .with_max_history(self.conversation.max_history)
    }
}
