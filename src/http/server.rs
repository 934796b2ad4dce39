//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, access log, panic capture)
//! - Keep `/health` outside trace segments
//! - Bind server to listener and shut down gracefully

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::fanout::{Aggregator, DownstreamClient};
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::panic_response;
use crate::observability::access_log::{access_log_middleware, AccessLog};
use crate::observability::tracing::{self as trace, Tracer};

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open access log: {0}")]
    AccessLog(#[source] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub aggregator: Arc<Aggregator>,
    pub tracer: Arc<dyn Tracer>,
}

/// HTTP server for the aggregator.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        let access_log = AccessLog::from_config(&config.observability).map_err(ServerError::AccessLog)?;
        Self::with_access_log(config, access_log)
    }

    /// Create a server writing access logs to the given sink.
    pub fn with_access_log(config: AppConfig, access_log: AccessLog) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let tracer = trace::from_config(&config);
        let client = DownstreamClient::new(&config.downstream, tracer.clone())?;
        let aggregator = Arc::new(Aggregator::new(&config, client));

        let state = AppState {
            config: config.clone(),
            aggregator,
            tracer,
        };

        let router = Self::build_router(state, access_log);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, access_log: AccessLog) -> Router {
        // Only these routes are wrapped in trace segments.
        let traced = Router::new()
            .route("/{path}", get(handlers::aggregate))
            .route("/{path}/", get(handlers::aggregate))
            .route_layer(middleware::from_fn_with_state(
                state.tracer.clone(),
                trace::segment_middleware,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/health/", get(handlers::health))
            .merge(traced)
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(access_log, access_log_middleware))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.path,
            backends = self.config.backends.len(),
            mode = %self.config.downstream.mode,
            xray = self.config.observability.xray_enabled,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceIdentity;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = AppConfig::default();
        config.identity = ServiceIdentity::new("svc", "v2");
        HttpServer::with_access_log(config, AccessLog::new(std::io::sink())).unwrap()
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_routes_without_network() {
        let router = server().router();

        assert_eq!(call(router.clone(), "/health").await, (StatusCode::OK, json!({"status": "ok"})));
        assert_eq!(call(router.clone(), "/app").await, (StatusCode::OK, json!([{"svc": "v2"}])));
        assert_eq!(
            call(router.clone(), "/other").await,
            (StatusCode::NOT_FOUND, json!({"message": "path other not found"}))
        );
        assert_eq!(
            call(router, "/").await,
            (StatusCode::NOT_FOUND, json!({"message": "path  not found"}))
        );
    }

    #[tokio::test]
    async fn test_trailing_slash_matches_segment() {
        let router = server().router();

        assert_eq!(call(router.clone(), "/app/").await, (StatusCode::OK, json!([{"svc": "v2"}])));
        assert_eq!(
            call(router, "/other/").await,
            (StatusCode::NOT_FOUND, json!({"message": "path other not found"}))
        );
    }

    #[tokio::test]
    async fn test_undecodable_segment_is_json_404() {
        let router = server().router();

        assert_eq!(
            call(router, "/%FF").await,
            (StatusCode::NOT_FOUND, json!({"message": "path %FF not found"}))
        );
    }

    #[tokio::test]
    async fn test_panics_become_500() {
        async fn explode() -> &'static str {
            panic!("handler exploded")
        }

        let router = Router::new()
            .route("/boom", get(explode))
            .layer(CatchPanicLayer::custom(panic_response));

        assert_eq!(
            call(router, "/boom").await,
            (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "internal server error"}))
        );
    }
}
