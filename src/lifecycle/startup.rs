//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the metrics exporter when configured
//! - Build the server (access log sink, HTTP client, router)
//! - Bind the listener and serve until shutdown

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::{validation, AppConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Start the service and block until it shuts down.
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    for backend in validation::invalid_backends(&config) {
        tracing::warn!(backend = %backend, "Backend URL is not a valid http(s) URL; requests to it will fail");
    }

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    server.run(listener, server_shutdown).await
}
