//! Infrastructure layer for crs-store
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod export;
pub mod health;
pub mod responder;
pub mod storage;

// Re-export commonly used types
pub use config::{
    BackendKind, ConfigError, ConfigLoader, FileConfig, FileExportConfig, FileLoggingConfig,
    FileServerConfig, FileSessionConfig, FileStorageConfig,
};
pub use export::{ExportTarget, ExportWriteError, ExportWriter};
pub use health::{HealthServer, health_routes};
pub use responder::PlaceholderResponder;
pub use storage::{DocumentStoreBackend, InMemoryBackend, connect_backend};
