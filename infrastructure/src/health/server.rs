//! Health endpoint.
//!
//! `GET /health` answers `200 {"status":"ok","backend":...}` while the
//! storage backend is reachable and `503 {"status":"degraded",...}` when its
//! ping fails.

use crs_application::ports::storage_backend::StorageBackend;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warp::{Filter, Rejection, Reply, http::StatusCode, reply};

/// Health payload
#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn health(
    backend: Arc<dyn StorageBackend>,
    check_backend: bool,
) -> Result<reply::WithStatus<reply::Json>, Rejection> {
    let probe = if check_backend {
        backend.ping().await
    } else {
        Ok(())
    };
    let (status, code, error) = match probe {
        Ok(()) => ("ok", StatusCode::OK, None),
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "Health check failed");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, Some(e.to_string()))
        }
    };
    Ok(reply::with_status(
        reply::json(&HealthStatus {
            status,
            backend: backend.name().to_string(),
            error,
        }),
        code,
    ))
}

/// The `GET /health` filter. Built from owned handles so it can be served
/// as `'static`.
pub fn health_routes(
    backend: Arc<dyn StorageBackend>,
    check_backend: bool,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || health(backend.clone(), check_backend))
}

/// HTTP server exposing the health route
pub struct HealthServer {
    backend: Arc<dyn StorageBackend>,
    check_backend: bool,
}

impl HealthServer {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            check_backend: true,
        }
    }

    pub fn with_check_backend(mut self, check: bool) -> Self {
        self.check_backend = check;
        self
    }


    /// Serve until `shutdown` is cancelled. Fails only if `addr` cannot be
    /// bound.
    pub async fn run(&self, addr: SocketAddr, shutdown: CancellationToken) -> Result<(), warp::Error> {
        let (bound, server) = warp::serve(health_routes(self.backend.clone(), self.check_backend))
            .try_bind_with_graceful_shutdown(addr, async move { shutdown.cancelled().await })?;
        info!(addr = %bound, "Health server listening");
        server.await;
        info!("Health server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;
    use async_trait::async_trait;
    use crs_application::ports::storage_backend::{Document, Query, StorageError};
    use serde_json::Value;

    /// Backend whose every call fails as unreachable.
    struct DownBackend;

    #[async_trait]
    impl StorageBackend for DownBackend {
        fn name(&self) -> &str {
            "document_store"
        }
        async fn put(&self, _: &str, _: &str, _: Value) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<Value>, StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn query(&self, _: &str, _: &Query) -> Result<Vec<Document>, StorageError> {
            Err(StorageError::Unavailable("down".into()))
        }
        async fn ping(&self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_health_ok() {
        let routes = health_routes(Arc::new(InMemoryBackend::new()), true);
        let res = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "in_memory");
    }

    #[tokio::test]
    async fn test_health_degraded_when_backend_down() {
        let routes = health_routes(Arc::new(DownBackend), true);
        let res = warp::test::request()
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_probe_can_be_disabled() {
        let routes = health_routes(Arc::new(DownBackend), false);
        let res = warp::test::request()
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let routes = health_routes(Arc::new(InMemoryBackend::new()), true);
        let res = warp::test::request()
            .path("/sessions")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let server = HealthServer::new(Arc::new(InMemoryBackend::new()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        server.run(addr, shutdown).await.unwrap();
    }
}
