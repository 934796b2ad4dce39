//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (APP_*, ENABLE_XRAY_TRACING, ACCESS_LOG_FILE, ...)
//!     → loader.rs (lookup & parse)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the request handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so an empty environment is valid
//! - Validation separates parsing errors from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, ConfigError};
pub use schema::{
    AppConfig, BackendList, DownstreamConfig, FanoutMode, ListenerConfig, LogFormat,
    ObservabilityConfig, ServiceIdentity,
};
