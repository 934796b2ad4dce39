//! Request handlers.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::Uri,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::tracing::TraceContext;

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /{path}` (or `/{path}/`): aggregate when the segment matches the
/// configured path.
pub async fn aggregate(
    State(state): State<AppState>,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
    trace: Option<Extension<TraceContext>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    // Undecodable segments can never match.
    let Ok(Path(path)) = path else {
        return Err(ApiError::PathNotFound(request_path(&uri)));
    };
    if path != state.config.path {
        tracing::debug!(path = %path, "Path does not match aggregation path");
        return Err(ApiError::PathNotFound(path));
    }

    let trace = trace.map(|Extension(ctx)| ctx);
    let response = state.aggregator.aggregate(trace.as_ref()).await?;

    tracing::debug!(
        backends = state.aggregator.backends().len(),
        elements = response.len(),
        "Aggregate assembled"
    );
    Ok(Json(response))
}

/// Anything that is not a single path segment.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::PathNotFound(request_path(&uri))
}

fn request_path(uri: &Uri) -> String {
    uri.path().trim_start_matches('/').to_string()
}
