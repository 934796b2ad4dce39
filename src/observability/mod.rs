//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → access_log.rs (one JSON line per request, stdout or file)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (segments/subsegments when tracing is enabled)
//!
//! Diagnostics:
//!     → logging.rs (tracing-subscriber, pretty or JSON, stderr)
//! ```
//!
//! # Design Decisions
//! - Access logs are independent of diagnostic log levels
//! - Request ID flows through spans and response headers
//! - Tracing is optional and selected once at startup

pub mod access_log;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use access_log::{AccessLog, AccessLogEntry};
pub use self::tracing::{NoopTracer, SegmentTracer, TraceContext, Tracer};
