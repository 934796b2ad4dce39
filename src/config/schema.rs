//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Every section has defaults so an empty environment still yields a runnable
//! instance.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Root configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Identity record placed first in every aggregate response.
    pub identity: ServiceIdentity,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Path segment that triggers aggregation (without leading `/`).
    pub path: String,

    /// Ordered downstream backends.
    pub backends: BackendList,

    /// Outbound call settings.
    pub downstream: DownstreamConfig,

    /// Logging, tracing and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identity: ServiceIdentity::default(),
            listener: ListenerConfig::default(),
            path: "app".to_string(),
            backends: BackendList::default(),
            downstream: DownstreamConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Segment name used when tracing is enabled.
    pub fn segment_name(&self) -> String {
        format!("{}-{}", self.identity.service_type, self.identity.version)
    }
}

/// Single-entry `{type: version}` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub service_type: String,
    pub version: String,
}

impl ServiceIdentity {
    pub fn new(service_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            version: version.into(),
        }
    }

    /// JSON form of the identity, as emitted in responses.
    pub fn to_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(
            self.service_type.clone(),
            serde_json::Value::String(self.version.clone()),
        );
        serde_json::Value::Object(map)
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self::new("backend", "v1")
    }
}

/// Ordered list of backend URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendList(Vec<String>);

impl BackendList {
    pub const DELIMITER: char = ';';

    /// Split a `;`-delimited string. The empty string yields no backends;
    /// anything else is split verbatim, so empty entries are kept in place.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        Self(raw.split(Self::DELIMITER).map(str::to_string).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for BackendList {
    fn from(urls: Vec<String>) -> Self {
        Self(urls)
    }
}

impl<'a> IntoIterator for &'a BackendList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// How backend calls are scheduled within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutMode {
    /// All backends are called at once and joined.
    #[default]
    Parallel,
    /// Backends are called one after another, in list order.
    Sequential,
}

impl FromStr for FanoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parallel" | "concurrent" => Ok(FanoutMode::Parallel),
            "sequential" => Ok(FanoutMode::Sequential),
            other => Err(format!("unknown fan-out mode '{}'", other)),
        }
    }
}

impl fmt::Display for FanoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanoutMode::Parallel => f.write_str("parallel"),
            FanoutMode::Sequential => f.write_str("sequential"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Outbound call settings.
#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    /// Scheduling of backend calls.
    pub mode: FanoutMode,

    /// Per-backend timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for backend calls.
    pub use_system_proxy: bool,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            mode: FanoutMode::Parallel,
            timeout_secs: None,
            use_system_proxy: true,
        }
    }
}

/// Diagnostic log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Diagnostic log format.
    pub log_format: LogFormat,

    /// Wrap non-health requests and outbound calls in trace segments.
    pub xray_enabled: bool,

    /// Append access logs here instead of stdout.
    pub access_log_file: Option<PathBuf>,

    /// Prometheus scrape endpoint; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            xray_enabled: false,
            access_log_file: None,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_list_parse() {
        assert!(BackendList::parse("").is_empty());

        let list = BackendList::parse("http://a:1;http://b:2");
        let urls: Vec<&String> = list.iter().collect();
        assert_eq!(urls, vec!["http://a:1", "http://b:2"]);

        // Empty entries keep their position
        let list = BackendList::parse("http://a;;http://c");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_identity_json() {
        let identity = ServiceIdentity::new("svc", "v2");
        assert_eq!(identity.to_value(), serde_json::json!({"svc": "v2"}));
    }

    #[test]
    fn test_fanout_mode_parse() {
        assert_eq!("parallel".parse::<FanoutMode>(), Ok(FanoutMode::Parallel));
        assert_eq!("Sequential".parse::<FanoutMode>(), Ok(FanoutMode::Sequential));
        assert!("random".parse::<FanoutMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.path, "app");
        assert_eq!(config.identity, ServiceIdentity::new("backend", "v1"));
        assert_eq!(config.segment_name(), "backend-v1");
    }
}
