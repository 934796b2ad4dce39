//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntactic parsing)
//! - Validate value ranges (port non-zero, path is a single segment)
//! - Flag backend URLs that will never succeed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unparsable backend URLs are warnings, not errors: they surface per
//!   request as error elements in the aggregate

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A semantic configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener port must be non-zero")]
    ZeroPort,

    #[error("aggregation path must not be empty")]
    EmptyPath,

    #[error("aggregation path '{0}' must be a single segment without '/'")]
    NestedPath(String),

    #[error("backend timeout must be greater than zero")]
    ZeroTimeout,
}

/// Validate a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.path.is_empty() {
        errors.push(ValidationError::EmptyPath);
    } else if config.path.contains('/') {
        errors.push(ValidationError::NestedPath(config.path.clone()));
    }

    if config.downstream.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Backend entries that are not absolute http(s) URLs.
pub fn invalid_backends(config: &AppConfig) -> Vec<String> {
    config
        .backends
        .iter()
        .filter(|raw| match Url::parse(raw) {
            Ok(url) => !matches!(url.scheme(), "http" | "https"),
            Err(_) => true,
        })
        .cloned()
        .collect()
}
