//! HTTP server for the scrape service
//!
//! Wraps the session engine in an axum application with the REST surface
//! defined in [`api`].

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::SessionEngine;

/// Header carrying the per-request ID, stamped on ingress and echoed on the
/// response
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub mod api;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Session engine
    pub engine: Arc<SessionEngine>,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// API Server
// ============================================================================

/// Main HTTP server
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, engine: Arc<SessionEngine>) -> Self {
        let state = AppState {
            engine,
            start_time: Instant::now(),
        };
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes.
    ///
    /// Every request gets an `x-request-id` (generated when the client sent
    /// none), visible in request traces and echoed on the response.
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone())
            .layer(PropagateRequestIdLayer::x_request_id());

        // Add tracing layer if enabled
        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http().make_span_with(
                |request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                },
            ));
        }

        // The ID must exist before the trace span is created
        router = router.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        // Add CORS layer if enabled
        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }

    /// Start the server with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address();

        tracing::info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("API server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OptionalCache;
    use crate::driver::NullDriverFactory;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn test_engine() -> Arc<SessionEngine> {
        Arc::new(SessionEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(OptionalCache::disabled()),
            Arc::new(crate::selectors::fixtures::schema()),
            Arc::new(NullDriverFactory),
            Duration::from_secs(5),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = ApiServer::new(ServerConfig::default(), test_engine());
        let state = server.state();
        assert!(!state.engine.is_shutting_down());
    }

    #[tokio::test]
    async fn test_build_router_with_layers() {
        let config = ServerConfig {
            enable_cors: true,
            enable_request_logging: true,
            ..ServerConfig::default()
        };
        let server = ApiServer::new(config, test_engine());
        let _router = server.build_router();
    }

    #[tokio::test]
    async fn test_responses_carry_generated_request_id() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let server = ApiServer::new(ServerConfig::default(), test_engine());
        let response = server
            .build_router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("response must carry a request id");
        assert!(!id.to_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let server = ApiServer::new(ServerConfig::default(), test_engine());
        let response = server
            .build_router()
            .oneshot(
                Request::get("/api/health")
                    .header(REQUEST_ID_HEADER, "client-supplied-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "client-supplied-id"
        );
    }
}
