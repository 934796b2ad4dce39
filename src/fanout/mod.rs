//! Backend fan-out subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → aggregate.rs (schedule calls: join_all or in-order loop)
//!     → client.rs (GET each backend, classify outcome)
//!     → aggregate.rs (identity + spliced results, configured order)
//! ```
//!
//! # Design Decisions
//! - Backend failures are contained as `{"error": ...}` elements
//! - Output order follows the backend list, never completion order
//! - A 200 with an unparsable body fails the whole aggregate (HTTP 500)

pub mod aggregate;
pub mod client;

use thiserror::Error;

pub use aggregate::Aggregator;
pub use client::{DownstreamClient, DownstreamError, DownstreamResult};

/// Failure that aborts an aggregate response.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid JSON body from {url}: {source}")]
    MalformedBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
