//! Outbound calls to a single backend.
//!
//! # Responsibilities
//! - Issue one GET per backend URL
//! - Classify the outcome: JSON body, HTTP status failure, transport failure
//! - Attach trace propagation headers when a segment is open

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;

use crate::config::DownstreamConfig;
use crate::fanout::AggregateError;
use crate::observability::metrics;
use crate::observability::tracing::{TraceContext, Tracer, TRACE_HEADER};

/// Why a backend contributed an error element.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("Got HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("{0}")]
    Transport(String),
}

/// Outcome of one backend call.
#[derive(Debug)]
pub enum DownstreamResult {
    /// Status 200 with a JSON body.
    Success(Value),
    /// Contained failure, rendered as `[{"error": ...}]`.
    Failed(DownstreamError),
}

impl DownstreamResult {
    /// Elements this result contributes to the aggregate.
    ///
    /// Arrays are spliced; any other JSON value is a single element.
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            DownstreamResult::Success(Value::Array(items)) => items,
            DownstreamResult::Success(other) => vec![other],
            DownstreamResult::Failed(e) => vec![json!({ "error": e.to_string() })],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DownstreamResult::Success(_))
    }
}

/// HTTP client shared by all requests.
#[derive(Debug, Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
    tracer: Arc<dyn Tracer>,
}

impl DownstreamClient {
    pub fn new(config: &DownstreamConfig, tracer: Arc<dyn Tracer>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            http: builder.build()?,
            tracer,
        })
    }

    /// GET `url` and classify the result.
    ///
    /// Only a 200 whose body is not valid JSON escapes as an error; every
    /// other failure is contained in the returned `DownstreamResult`.
    pub async fn fetch(
        &self,
        url: &str,
        trace: Option<&TraceContext>,
    ) -> Result<DownstreamResult, AggregateError> {
        let (span, trace_header) = self.tracer.subsegment(trace, url);
        let start = Instant::now();

        let result = self.send(url, trace_header).instrument(span).await;

        let success = result.as_ref().is_ok_and(DownstreamResult::is_success);
        metrics::record_downstream(success, start);
        result
    }

    async fn send(
        &self,
        url: &str,
        trace_header: Option<reqwest::header::HeaderValue>,
    ) -> Result<DownstreamResult, AggregateError> {
        let mut request = self.http.get(url);
        if let Some(value) = trace_header {
            request = request.header(TRACE_HEADER, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Backend request failed");
                return Ok(DownstreamResult::Failed(DownstreamError::Transport(e.to_string())));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(url = %url, status = %status, "Backend returned non-200 status");
            return Ok(DownstreamResult::Failed(DownstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read backend body");
                return Ok(DownstreamResult::Failed(DownstreamError::Transport(e.to_string())));
            }
        };

        let value = serde_json::from_slice(&body).map_err(|source| AggregateError::MalformedBody {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!(url = %url, bytes = body.len(), "Backend responded");
        Ok(DownstreamResult::Success(value))
    }
}
