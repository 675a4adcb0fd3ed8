// Integration tests: HTTP endpoints over the store and the in-memory runtime

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use dockhours::models::{Container, DataDocument, Group, Schedule};
use dockhours::routes;
use dockhours::runtime::MemoryRuntime;
use dockhours::store::{DocumentStore, PersistableStore, SnapshotSource};
use serde_json::json;
use std::sync::Arc;

fn test_server() -> (TestServer, Arc<DocumentStore>, Arc<MemoryRuntime>) {
    let store = Arc::new(DocumentStore::new(office_hours_doc()));
    let runtime = Arc::new(MemoryRuntime::new(["web", "db"]));
    let app = routes::app(store.clone(), runtime.clone());
    (TestServer::new(app), store, runtime)
}

#[tokio::test]
async fn test_version_endpoint() {
    let (server, _, _) = test_server();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("dockhours")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_data_endpoint_returns_snapshot() {
    let (server, _, _) = test_server();
    let doc: DataDocument = server.get("/api/data").await.json();
    assert_eq!(doc.metadata.last_update, 1000);
    assert_eq!(doc.containers.len(), 1);
}

#[tokio::test]
async fn test_upsert_container_marks_dirty_and_keeps_order() {
    let (server, store, _) = test_server();
    let response = server
        .post("/api/containers")
        .json(&json!({ "name": "db", "friendlyName": "Database", "active": true }))
        .await;
    response.assert_status_ok();
    let list: Vec<Container> = response.json();
    let names: Vec<&str> = list.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_upsert_container_rejects_empty_name() {
    let (server, store, _) = test_server();
    let response = server
        .post("/api/containers")
        .json(&json!({ "name": "" }))
        .await;
    response.assert_status_bad_request();
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_delete_unknown_container_is_404() {
    let (server, _, _) = test_server();
    server
        .delete("/api/containers/nope")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_delete_container_cascades_schedules() {
    let (server, store, _) = test_server();
    server.delete("/api/containers/web").await.assert_status_ok();
    let schedules: Vec<Schedule> = server.get("/api/schedules").await.json();
    assert!(schedules.is_empty());
    assert!(store.snapshot().containers.is_empty());
}

#[tokio::test]
async fn test_groups_and_schedules_crud() {
    let (server, _, _) = test_server();
    let groups: Vec<Group> = server
        .post("/api/groups")
        .json(&json!({ "name": "stack", "container": ["web", "db"], "active": true }))
        .await
        .json();
    assert_eq!(groups.len(), 1);

    let schedules: Vec<Schedule> = server
        .post("/api/schedules")
        .json(&json!({
            "id": "S2",
            "target": "stack",
            "targetType": "group",
            "timers": [{ "startTime": "22:00", "stopTime": "06:00", "days": [1], "active": true }]
        }))
        .await
        .json();
    assert_eq!(schedules.len(), 2);

    server
        .post("/api/schedules")
        .json(&json!({
            "id": "S3",
            "target": "stack",
            "targetType": "group",
            "timers": [{ "startTime": "9am", "stopTime": "06:00", "days": [1] }]
        }))
        .await
        .assert_status_bad_request();

    let groups: Vec<Group> = server.delete("/api/groups/stack").await.json();
    assert!(groups.is_empty());
    let schedules: Vec<Schedule> = server.get("/api/schedules").await.json();
    assert_eq!(schedules.len(), 1);

    server
        .delete("/api/schedules/S2")
        .await
        .assert_status_not_found();
    server.delete("/api/schedules/S1").await.assert_status_ok();
}

#[tokio::test]
async fn test_on_demand_start_is_accepted_and_runs_in_background() {
    let (server, store, runtime) = test_server();
    let response = server.post("/api/containers/web/start").await;
    response.assert_status(StatusCode::ACCEPTED);
    assert!(store.snapshot().container("web").unwrap().activated_at.is_some());

    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);
    while !runtime.running("web") {
        assert!(tokio::time::Instant::now() < deadline, "start never ran");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    let status: serde_json::Value = server.get("/api/containers/web/status").await.json();
    assert_eq!(status["running"], json!(true));

    server
        .post("/api/containers/web/stop")
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .post("/api/containers/ghost/start")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_out_of_range_day_is_bad_request() {
    let (server, store, _) = test_server();
    let response = server
        .post("/api/schedules")
        .json(&json!({
            "id": "S9",
            "target": "web",
            "targetType": "container",
            "timers": [{ "startTime": "09:00", "stopTime": "17:00", "days": [300], "active": true }]
        }))
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("out of range"));
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_runtime_failure_is_internal_error() {
    let (server, _, runtime) = test_server();
    runtime.set_failing("web", true);
    let response = server.get("/api/containers/web/status").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_runtime_container_listing() {
    let (server, _, _) = test_server();
    let names: Vec<String> = server.get("/api/runtime/containers").await.json();
    assert_eq!(names, vec!["db", "web"]);
}
