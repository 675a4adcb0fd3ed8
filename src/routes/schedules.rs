// Group and schedule handlers

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use super::AppState;
use super::http::ApiError;
use crate::models::{DataDocument, Group, Schedule};
use crate::store::{GroupStore, ScheduleStore, SnapshotSource};

fn ordered_groups(doc: &DataDocument) -> Vec<Group> {
    doc.ordered_groups().into_iter().cloned().collect()
}

pub(super) async fn list_groups(State(state): State<AppState>) -> impl IntoResponse {
    Json(ordered_groups(&state.store.snapshot()))
}

pub(super) async fn upsert_group(
    State(state): State<AppState>,
    Json(group): Json<Group>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.add_group(group)?;
    Ok(Json(ordered_groups(&doc)))
}

pub(super) async fn remove_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.remove_group(&name)?;
    Ok(Json(ordered_groups(&doc)))
}

pub(super) async fn list_schedules(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot().schedules)
}

pub(super) async fn upsert_schedule(
    State(state): State<AppState>,
    Json(schedule): Json<Schedule>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.store.add_schedule(schedule)?.schedules))
}

pub(super) async fn remove_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.store.remove_schedule(&id)?.schedules))
}
