// HTTP routes: CRUD over the document store plus on-demand start/stop

mod containers;
mod http;
mod schedules;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::runtime::Runtime;
use crate::store::DocumentStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<DocumentStore>,
    pub(crate) runtime: Arc<dyn Runtime>,
}

pub fn app(store: Arc<DocumentStore>, runtime: Arc<dyn Runtime>) -> Router {
    let state = AppState { store, runtime };
    Router::new()
        .route("/version", get(http::version_handler))
        .route("/api/data", get(http::data_handler))
        .route(
            "/api/containers",
            get(containers::list).post(containers::upsert),
        )
        .route("/api/containers/{name}", delete(containers::remove))
        .route("/api/containers/{name}/start", post(containers::start))
        .route("/api/containers/{name}/stop", post(containers::stop))
        .route("/api/containers/{name}/status", get(containers::status))
        .route("/api/runtime/containers", get(containers::runtime_list))
        .route("/api/groups", get(schedules::list_groups).post(schedules::upsert_group))
        .route("/api/groups/{name}", delete(schedules::remove_group))
        .route(
            "/api/schedules",
            get(schedules::list_schedules).post(schedules::upsert_schedule),
        )
        .route("/api/schedules/{id}", delete(schedules::remove_schedule))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
