//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Map handler errors to HTTP status codes and JSON bodies
//! - Render panics caught by the middleware stack as 500s
//!
//! # Design Decisions
//! - Every error path answers the client; nothing is left hanging
//! - Bodies are always JSON

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;
use thiserror::Error;

use crate::fanout::AggregateError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("path {0} not found")]
    PathNotFound(String),

    #[error(transparent)]
    Aggregation(#[from] AggregateError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PathNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::PathNotFound(_) => json!({ "message": self.to_string() }),
            ApiError::Aggregation(e) => {
                tracing::error!(error = %e, "Aggregation failed");
                json!({ "error": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Response for a panic caught while handling a request.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}
