//! Structured access logging.
//!
//! One JSON object per request, written to stdout or appended to a file.
//!
//! Lines are handed to a `tracing-appender` worker thread, so request tasks
//! never block on the sink. The worker flushes what is queued when the last
//! handle is dropped.

use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Version},
    middleware::Next,
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

use crate::config::ObservabilityConfig;
use crate::observability::metrics;

/// Structured access log entry.
#[derive(Debug, Serialize)]
pub struct AccessLogEntry {
    pub time: String,
    #[serde(rename = "remote-address", skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    pub method: String,
    pub url: String,
    #[serde(rename = "http-version")]
    pub http_version: &'static str,
    #[serde(rename = "status-code")]
    pub status_code: u16,
    #[serde(rename = "content-length", skip_serializing_if = "Option::is_none")]
    pub content_length: Option<String>,
    /// Milliseconds.
    #[serde(rename = "response-time")]
    pub response_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(rename = "user-agent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Shared access log sink.
#[derive(Clone)]
pub struct AccessLog {
    writer: NonBlocking,
    _guard: Arc<WorkerGuard>,
}

impl std::fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLog").finish_non_exhaustive()
    }
}

impl AccessLog {
    /// Route lines to `writer` through a background worker.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        let (writer, guard) = tracing_appender::non_blocking(writer);
        Self {
            writer,
            _guard: Arc::new(guard),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Open `path` in append mode, creating it if needed.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    pub fn from_config(config: &ObservabilityConfig) -> io::Result<Self> {
        match &config.access_log_file {
            Some(path) => Self::append_to(path),
            None => Ok(Self::stdout()),
        }
    }

    /// Write one line. Failures are reported but never fail the request.
    pub fn write(&self, entry: &AccessLogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize access log entry");
                return;
            }
        };

        // One buffer per line so the worker never interleaves entries.
        let mut writer = self.writer.clone();
        if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()) {
            tracing::warn!(error = %e, "Failed to queue access log entry");
        }
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Header value if set, otherwise the exact body size when known.
fn content_length(response: &Response) -> Option<String> {
    header_string(response.headers(), header::CONTENT_LENGTH)
        .or_else(|| response.body().size_hint().exact().map(|n| n.to_string()))
}

/// Middleware recording every request to the access log and request metrics.
pub async fn access_log_middleware(
    State(log): State<AccessLog>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let http_version = version_str(req.version());
    let remote_address = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let referrer = header_string(req.headers(), header::REFERER);
    let user_agent = header_string(req.headers(), header::USER_AGENT);

    let response = next.run(req).await;

    let status = response.status().as_u16();
    metrics::record_request(&method, status, start);

    log.write(&AccessLogEntry {
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        remote_address,
        method,
        url,
        http_version,
        status_code: status,
        content_length: content_length(&response),
        response_time: start.elapsed().as_secs_f64() * 1000.0,
        referrer,
        user_agent,
    });

    response
}
