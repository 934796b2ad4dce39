//! Fan-out Aggregator
//!
//! A small HTTP service built with Tokio and Axum that identifies itself and
//! aggregates the JSON responses of downstream backends.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ /health ──────────────▶ {"status":"ok"}
//!                          │
//!                          └────────▶ /{path} ──▶ fanout::aggregate
//!                                                     │  GET each backend
//!                                                     ▼  (join_all or in order)
//!     Client Response                            fanout::client ──▶ Backend
//!     ◀────────────── [identity, ...backend results]
//!
//!     Cross-cutting: config (env) · observability (logs, access log,
//!     segments, metrics) · lifecycle (startup, signals, shutdown)
//! ```

use fanout_aggregator::config;
use fanout_aggregator::lifecycle::startup;
use fanout_aggregator::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_from_env()?;

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        identity = %config.segment_name(),
        "fanout-aggregator starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
