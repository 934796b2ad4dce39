//! Metrics collection and exposition.
//!
//! # Metrics
//! - `aggregator_requests_total` (counter): inbound requests by method, status
//! - `aggregator_request_duration_seconds` (histogram): inbound latency
//! - `aggregator_downstream_requests_total` (counter): backend calls by outcome
//! - `aggregator_downstream_duration_seconds` (histogram): backend latency
//!
//! Recording is a no-op until a recorder is installed with `init_metrics`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Label for a request method. Non-standard methods share `other`.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "other",
    }
}

/// Record a completed inbound request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method_label(method);
    let status = status.to_string();
    counter!("aggregator_requests_total", "method" => method, "status" => status.clone())
        .increment(1);
    histogram!("aggregator_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Record one backend call.
pub fn record_downstream(success: bool, start: Instant) {
    let outcome = if success { "ok" } else { "error" };
    counter!("aggregator_downstream_requests_total", "outcome" => outcome).increment(1);
    histogram!("aggregator_downstream_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
