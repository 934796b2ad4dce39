//! Distributed tracing support.
//!
//! # Responsibilities
//! - Open a segment for each traced inbound request
//! - Open a subsegment for each outbound backend call
//! - Propagate trace context to backends via `X-Amzn-Trace-Id`
//!
//! # Design Decisions
//! - Tracing is a capability: handlers always call the `Tracer`, and the
//!   no-op implementation is selected when tracing is disabled
//! - Segments are `tracing` spans, so any subscriber/exporter can consume them
//! - `/health` is routed outside the segment middleware

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{Instrument, Span};

use crate::config::AppConfig;

/// Trace propagation header.
pub const TRACE_HEADER: HeaderName = HeaderName::from_static("x-amzn-trace-id");

/// Trace identity carried through one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// `1-<epoch hex>-<random hex>`.
    pub root: String,
    /// Id of the segment opened for this request.
    pub segment_id: String,
}

impl TraceContext {
    /// Fresh context with a new root.
    pub fn generate() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let random: [u8; 12] = rand::thread_rng().gen();
        Self {
            root: format!("1-{:08x}-{}", epoch as u32, hex(&random)),
            segment_id: new_segment_id(),
        }
    }

    /// Continue the trace named by an incoming header, if it carries a root.
    pub fn from_header(value: &str) -> Option<Self> {
        value
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .find(|(key, _)| key.eq_ignore_ascii_case("root"))
            .map(|(_, root)| root.trim())
            .filter(|root| !root.is_empty())
            .map(|root| Self {
                root: root.to_string(),
                segment_id: new_segment_id(),
            })
    }

    /// Header value sent to a backend for a subsegment.
    pub fn downstream_header(&self, subsegment_id: &str) -> String {
        format!("Root={};Parent={};Sampled=1", self.root, subsegment_id)
    }

    /// Header value echoed on the inbound response.
    pub fn response_header(&self) -> String {
        format!("Root={}", self.root)
    }
}

/// Random 16 hex-digit segment id.
pub fn new_segment_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex(&bytes)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Tracing capability used by the request path.
pub trait Tracer: Send + Sync + std::fmt::Debug {
    /// Start a segment for an inbound request. `None` means untraced.
    fn open_segment(&self, headers: &HeaderMap) -> Option<TraceContext>;

    /// Span covering an inbound request.
    fn segment_span(&self, ctx: Option<&TraceContext>, method: &Method, path: &str) -> Span;

    /// Span covering one outbound call, with the header value to send.
    fn subsegment(&self, ctx: Option<&TraceContext>, url: &str) -> (Span, Option<HeaderValue>);
}

/// Tracer used when tracing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn open_segment(&self, _headers: &HeaderMap) -> Option<TraceContext> {
        None
    }

    fn segment_span(&self, _ctx: Option<&TraceContext>, _method: &Method, _path: &str) -> Span {
        Span::none()
    }

    fn subsegment(&self, _ctx: Option<&TraceContext>, _url: &str) -> (Span, Option<HeaderValue>) {
        (Span::none(), None)
    }
}

/// Tracer emitting X-Ray style segments as `tracing` spans.
#[derive(Debug, Clone)]
pub struct SegmentTracer {
    name: String,
}

impl SegmentTracer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Tracer for SegmentTracer {
    fn open_segment(&self, headers: &HeaderMap) -> Option<TraceContext> {
        let incoming = headers
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(TraceContext::from_header);
        Some(incoming.unwrap_or_else(TraceContext::generate))
    }

    fn segment_span(&self, ctx: Option<&TraceContext>, method: &Method, path: &str) -> Span {
        let Some(ctx) = ctx else {
            return Span::none();
        };
        tracing::info_span!(
            "segment",
            segment = %self.name,
            trace_id = %ctx.root,
            segment_id = %ctx.segment_id,
            http.method = %method,
            http.path = %path,
            http.status = tracing::field::Empty,
        )
    }

    fn subsegment(&self, ctx: Option<&TraceContext>, url: &str) -> (Span, Option<HeaderValue>) {
        let Some(ctx) = ctx else {
            return (Span::none(), None);
        };
        let subsegment_id = new_segment_id();
        let span = tracing::info_span!(
            "subsegment",
            trace_id = %ctx.root,
            parent_id = %ctx.segment_id,
            subsegment_id = %subsegment_id,
            http.url = %url,
        );
        let header = HeaderValue::from_str(&ctx.downstream_header(&subsegment_id)).ok();
        (span, header)
    }
}

/// Select the tracer for this configuration.
pub fn from_config(config: &AppConfig) -> Arc<dyn Tracer> {
    if config.observability.xray_enabled {
        Arc::new(SegmentTracer::new(config.segment_name()))
    } else {
        Arc::new(NoopTracer)
    }
}

/// Middleware wrapping a request in a segment.
///
/// Inserts the `TraceContext` as a request extension for the handler and
/// echoes the trace header on the response.
pub async fn segment_middleware(
    State(tracer): State<Arc<dyn Tracer>>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = tracer.open_segment(req.headers());
    let span = tracer.segment_span(ctx.as_ref(), req.method(), req.uri().path());
    if let Some(ctx) = &ctx {
        req.extensions_mut().insert(ctx.clone());
    }

    let mut response = next.run(req).instrument(span.clone()).await;
    span.record("http.status", response.status().as_u16());

    if let Some(ctx) = ctx {
        if let Ok(value) = HeaderValue::from_str(&ctx.response_header()) {
            response.headers_mut().insert(TRACE_HEADER, value);
        }
    }
    response
}
