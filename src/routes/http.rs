// GET handlers: version, full document; error mapping shared by all handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::Error;
use crate::store::SnapshotSource;

/// Package version (from Cargo.toml at build time).
const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

pub(super) enum ApiError {
    Store(Error),
    Runtime(anyhow::Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Store(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Runtime(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(e @ Error::NotFound { .. }) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Store(e @ Error::Validation(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Runtime(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// GET /version — service name and version.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/data — the whole document as currently held in memory.
pub(super) async fn data_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot())
}
