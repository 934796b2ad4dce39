//! Fan-out aggregator service library.
//!
//! Serves `GET /health` and `GET /{path}`; the latter returns this instance's
//! identity followed by the JSON responses of every configured backend.

pub mod config;
pub mod fanout;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
