//! Configuration file loading for crs-store
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables (`DATABASE_BACKEND`, `DATABASE_URL`, `SESSION_TIMEOUT`, ...)
//! 2. `--config <path>` specified file
//! 3. Project root: `./crs.toml` or `./.crs.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/crs-store/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    BackendKind, ConfigError, FileConfig, FileConversationConfig, FileExportConfig,
    FileLoggingConfig, FileServerConfig, FileSessionConfig, FileStorageConfig,
};
pub use loader::{ConfigLoader, ENV_VARS};
