//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{AppConfig, BackendList, ServiceIdentity};
use crate::config::validation::{validate_config, ValidationError};

pub const APP_TYPE: &str = "APP_TYPE";
pub const APP_VERSION: &str = "APP_VERSION";
pub const APP_PORT: &str = "APP_PORT";
pub const APP_PATH: &str = "APP_PATH";
pub const APP_BACKENDS: &str = "APP_BACKENDS";
pub const APP_FANOUT_MODE: &str = "APP_FANOUT_MODE";
pub const APP_BACKEND_TIMEOUT_SECS: &str = "APP_BACKEND_TIMEOUT_SECS";
pub const APP_BACKEND_USE_PROXY: &str = "APP_BACKEND_USE_PROXY";
pub const ENABLE_XRAY_TRACING: &str = "ENABLE_XRAY_TRACING";
pub const ACCESS_LOG_FILE: &str = "ACCESS_LOG_FILE";
pub const LOG_FORMAT: &str = "LOG_FORMAT";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const METRICS_ADDRESS: &str = "METRICS_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment.
///
/// A `.env` file in the working directory, when present, supplies variables
/// the process environment leaves unset.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    let file = dotenv::dotenv_iter()
        .map(read_env_file)
        .unwrap_or_default();
    from_sources(|key| std::env::var(key).ok(), &file)
}

/// Collect the variables of a `.env` file. Malformed lines are skipped.
pub fn read_env_file<I, E>(lines: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = Result<(String, String), E>>,
{
    lines.into_iter().filter_map(Result::ok).collect()
}

/// Build configuration from the environment, falling back to `.env` values.
pub fn from_sources<F>(env: F, file: &HashMap<String, String>) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    from_lookup(|key| env(key).or_else(|| file.get(key).cloned()))
}

/// Build configuration from an arbitrary variable lookup.
///
/// Unset or empty variables fall back to defaults.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| non_empty(lookup(key));
    let mut config = AppConfig::default();

    let defaults = ServiceIdentity::default();
    config.identity = ServiceIdentity::new(
        lookup(APP_TYPE).unwrap_or(defaults.service_type),
        lookup(APP_VERSION).unwrap_or(defaults.version),
    );

    if let Some(port) = lookup(APP_PORT) {
        config.listener.port = parse_var(APP_PORT, &port)?;
    }
    if let Some(path) = lookup(APP_PATH) {
        config.path = path;
    }
    if let Some(backends) = lookup(APP_BACKENDS) {
        config.backends = BackendList::parse(&backends);
    }

    if let Some(mode) = lookup(APP_FANOUT_MODE) {
        config.downstream.mode = parse_var(APP_FANOUT_MODE, &mode)?;
    }
    if let Some(timeout) = lookup(APP_BACKEND_TIMEOUT_SECS) {
        config.downstream.timeout_secs = Some(parse_var(APP_BACKEND_TIMEOUT_SECS, &timeout)?);
    }

    if let Some(proxy) = lookup(APP_BACKEND_USE_PROXY) {
        config.downstream.use_system_proxy = parse_var(APP_BACKEND_USE_PROXY, &proxy)?;
    }

    // Only the literal "true" enables tracing.
    config.observability.xray_enabled = lookup(ENABLE_XRAY_TRACING).as_deref() == Some("true");
    config.observability.access_log_file = lookup(ACCESS_LOG_FILE).map(PathBuf::from);

    if let Some(format) = lookup(LOG_FORMAT) {
        config.observability.log_format = parse_var(LOG_FORMAT, &format)?;
    }
    if let Some(level) = lookup(LOG_LEVEL) {
        config.observability.log_level = level;
    }
    if let Some(addr) = lookup(METRICS_ADDRESS) {
        parse_var::<std::net::SocketAddr>(METRICS_ADDRESS, &addr)?;
        config.observability.metrics_address = Some(addr);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FanoutMode, LogFormat};

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.identity, ServiceIdentity::new("backend", "v1"));
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.path, "app");
        assert!(config.backends.is_empty());
        assert!(!config.observability.xray_enabled);
        assert!(config.observability.access_log_file.is_none());
        assert_eq!(config.downstream.mode, FanoutMode::Parallel);
        assert_eq!(config.downstream.timeout_secs, None);
        assert!(config.downstream.use_system_proxy);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = load(&[
            ("APP_TYPE", "svc"),
            ("APP_VERSION", "v2"),
            ("APP_PORT", "8080"),
            ("APP_PATH", "api"),
            ("APP_BACKENDS", "http://a:1/app;http://b:2/app"),
            ("APP_FANOUT_MODE", "sequential"),
            ("APP_BACKEND_TIMEOUT_SECS", "5"),
            ("APP_BACKEND_USE_PROXY", "false"),
            ("ENABLE_XRAY_TRACING", "true"),
            ("ACCESS_LOG_FILE", "/tmp/access.log"),
            ("LOG_FORMAT", "json"),
            ("METRICS_ADDRESS", "127.0.0.1:9100"),
        ])
        .unwrap();

        assert_eq!(config.identity, ServiceIdentity::new("svc", "v2"));
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.path, "api");
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.downstream.mode, FanoutMode::Sequential);
        assert_eq!(config.downstream.timeout_secs, Some(5));
        assert!(!config.downstream.use_system_proxy);
        assert!(config.observability.xray_enabled);
        assert_eq!(
            config.observability.access_log_file,
            Some(PathBuf::from("/tmp/access.log"))
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.metrics_address.as_deref(), Some("127.0.0.1:9100"));
    }

    #[test]
    fn test_tracing_flag_requires_literal_true() {
        assert!(!load(&[("ENABLE_XRAY_TRACING", "TRUE")]).unwrap().observability.xray_enabled);
        assert!(!load(&[("ENABLE_XRAY_TRACING", "1")]).unwrap().observability.xray_enabled);
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("APP_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "APP_PORT", .. }));
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = load(&[("APP_PATH", "a/b")]).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::NestedPath("a/b".into())])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_access_log_means_stdout() {
        let config = load(&[("ACCESS_LOG_FILE", "")]).unwrap();
        assert!(config.observability.access_log_file.is_none());
    }

    #[test]
    fn test_empty_variables_use_defaults() {
        let config = load(&[
            ("APP_TYPE", ""),
            ("APP_VERSION", ""),
            ("APP_PORT", ""),
            ("APP_PATH", ""),
            ("APP_BACKENDS", ""),
            ("ENABLE_XRAY_TRACING", ""),
            ("ACCESS_LOG_FILE", ""),
        ])
        .unwrap();

        let defaults = AppConfig::default();
        assert_eq!(config.identity, defaults.identity);
        assert_eq!(config.identity.to_value(), serde_json::json!({"backend": "v1"}));
        assert_eq!(config.listener.port, defaults.listener.port);
        assert_eq!(config.path, defaults.path);
        assert!(config.backends.is_empty());
        assert!(!config.observability.xray_enabled);
        assert!(config.observability.access_log_file.is_none());
    }

    #[test]
    fn test_env_file_fills_unset_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "APP_TYPE=svc\nAPP_VERSION=v2\nAPP_PORT=8080\n").unwrap();

        let file = read_env_file(dotenv::from_path_iter(&path).unwrap());
        assert_eq!(file.get("APP_TYPE").map(String::as_str), Some("svc"));

        let env: HashMap<String, String> = [("APP_VERSION".to_string(), "v3".to_string())].into();
        let config = from_sources(|key| env.get(key).cloned(), &file).unwrap();

        // The process environment wins over the file.
        assert_eq!(config.identity, ServiceIdentity::new("svc", "v3"));
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let config = from_sources(|_| None, &HashMap::new()).unwrap();
        assert_eq!(config.listener.port, 3000);
    }
}
