// Container handlers. Start/stop requests return immediately; the runtime call
// runs in a detached task.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use super::AppState;
use super::http::ApiError;
use crate::error::Error;
use crate::models::{Container, DataDocument};
use crate::store::{ContainerStore, SnapshotSource};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ContainerStatus {
    name: String,
    running: bool,
    cpu_percent: f64,
    memory_mb: f64,
}

fn ordered(doc: &DataDocument) -> Vec<Container> {
    doc.ordered_containers().into_iter().cloned().collect()
}

pub(super) async fn list(State(state): State<AppState>) -> impl IntoResponse {
    Json(ordered(&state.store.snapshot()))
}

pub(super) async fn upsert(
    State(state): State<AppState>,
    Json(container): Json<Container>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.add_container(container)?;
    Ok(Json(ordered(&doc)))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.remove_container(&name)?;
    Ok(Json(ordered(&doc)))
}

pub(super) async fn start(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.set_activated_at(&name, chrono::Utc::now())?;

    let runtime = state.runtime.clone();
    tokio::spawn(async move {
        match runtime.start(&name).await {
            Ok(()) => tracing::info!(container = %name, "on-demand start"),
            Err(e) => tracing::warn!(container = %name, error = %e, "on-demand start failed"),
        }
    });
    Ok(StatusCode::ACCEPTED)
}

pub(super) async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.snapshot().container(&name).is_none() {
        return Err(Error::not_found("container", name).into());
    }
    let runtime = state.runtime.clone();
    tokio::spawn(async move {
        match runtime.stop(&name).await {
            Ok(()) => tracing::info!(container = %name, "on-demand stop"),
            Err(e) => tracing::warn!(container = %name, error = %e, "on-demand stop failed"),
        }
    });
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/containers/{name}/status — live state from the runtime.
pub(super) async fn status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ContainerStatus>, ApiError> {
    if state.store.snapshot().container(&name).is_none() {
        return Err(Error::not_found("container", name).into());
    }
    let running = state.runtime.is_running(&name).await?;
    let usage = if running {
        state.runtime.stats(&name).await?
    } else {
        Default::default()
    };
    Ok(Json(ContainerStatus {
        name,
        running,
        cpu_percent: usage.cpu_percent,
        memory_mb: usage.memory_mb,
    }))
}

/// GET /api/runtime/containers — every container the runtime knows about.
pub(super) async fn runtime_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.runtime.list_containers().await?))
}
