//! Storage backends implementing the
//! [`StorageBackend`](crs_application::StorageBackend) port.
//!
//! - [`InMemoryBackend`]: process-local maps, for development and tests
//! - [`DocumentStoreBackend`]: durable SQLite document table
//!
//! [`connect_backend`] picks one from configuration at startup.

mod document_store;
mod memory;

pub use document_store::DocumentStoreBackend;
pub use memory::InMemoryBackend;

use crate::config::{BackendKind, FileStorageConfig};
use crs_application::ports::storage_backend::{StorageBackend, StorageError};
use std::sync::Arc;
use tracing::info;

/// Build the configured backend. Called once at startup; the result is shared
/// by every store.
pub async fn connect_backend(
    config: &FileStorageConfig,
) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match config.backend {
        BackendKind::InMemory => Arc::new(InMemoryBackend::new()),
        BackendKind::DocumentStore => {
            let url = config.credentials.as_deref().ok_or_else(|| {
                StorageError::Unavailable("no credentials configured for document_store".into())
            })?;
            Arc::new(
                DocumentStoreBackend::connect(url, &config.project_id, config.max_connections)
                    .await?,
            )
        }
    };
    info!(backend = backend.name(), "Storage backend ready");
    Ok(backend)
}
