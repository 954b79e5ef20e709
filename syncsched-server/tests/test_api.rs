//! HTTP contract tests for the scheduler API
//!
//! Exercises the router directly with `tower::ServiceExt::oneshot` against the
//! in-memory config store and task runner.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use syncsched::config::SchedulerConfig;
use syncsched::runner::MemoryTaskRunner;
use syncsched::scheduler::SyncScheduler;
use syncsched::store::{MemoryConfigStore, SyncConfig};
use syncsched_server::{router, AppState};
use tower::ServiceExt;

fn test_app() -> (Router, Arc<MemoryConfigStore>, Arc<MemoryTaskRunner>) {
  let store = Arc::new(MemoryConfigStore::new());
  let runner = Arc::new(MemoryTaskRunner::new());
  let scheduler = SyncScheduler::new(store.clone(), runner.clone(), SchedulerConfig::default());
  let state = Arc::new(AppState {
    scheduler,
    runner: runner.clone(),
  });
  (router(state), store, runner)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = match body {
    Some(value) => Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(value.to_string()))
      .unwrap(),
    None => Request::builder()
      .method(method)
      .uri(uri)
      .body(Body::empty())
      .unwrap(),
  };
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = response.into_body().collect().await.unwrap().to_bytes();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

#[tokio::test]
async fn test_refresh_then_status() {
  let (app, store, _) = test_app();
  store.insert(SyncConfig::new(1, "*/30 * * * *")).await;
  store
    .insert(SyncConfig::new(2, "0 2 * * *").with_enabled(false))
    .await;

  let (status, body) = send(&app, Method::POST, "/task/scheduler/refresh-tasks", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["code"], 200);
  assert_eq!(body["data"]["added_count"], 1);
  assert_eq!(body["data"]["success"], true);

  let (status, body) = send(&app, Method::GET, "/task/scheduler/task-status", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["entry_count"], 1);
  assert_eq!(body["data"]["scheduled_config_ids"], json!([1]));
}

#[tokio::test]
async fn test_validate_cron_reports_in_payload() {
  let (app, _, _) = test_app();

  let (status, body) = send(
    &app,
    Method::POST,
    "/task/scheduler/validate-cron",
    Some(json!("*/5 * * * *")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["valid"], true);
  assert_eq!(body["data"]["next_runs"].as_array().unwrap().len(), 5);

  // Malformed input is reported in the payload, not as an HTTP error
  let (status, body) = send(
    &app,
    Method::POST,
    "/task/scheduler/validate-cron",
    Some(json!("60 * * * *")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["valid"], false);
  assert!(body["data"]["error"]
    .as_str()
    .unwrap()
    .contains("out of range"));
}

#[tokio::test]
async fn test_execute_sync_and_result_lookup() {
  let (app, store, runner) = test_app();
  store.insert(SyncConfig::new(7, "0 3 * * *")).await;

  let (status, body) = send(&app, Method::POST, "/task/scheduler/execute-sync/7", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["config_id"], 7);
  assert_eq!(body["data"]["status"], "submitted");
  let task_id = body["data"]["task_id"].as_str().unwrap().to_string();

  let uri = format!("/task/scheduler/task-result/{task_id}");
  let (status, body) = send(&app, Method::GET, &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], "PENDING");

  runner.complete(&task_id, json!({"synced_files": 4})).await;
  let (_, body) = send(&app, Method::GET, &uri, None).await;
  assert_eq!(body["data"]["status"], "SUCCESS");
  assert_eq!(body["data"]["result"]["synced_files"], 4);
}

#[tokio::test]
async fn test_execute_sync_unknown_config_is_404() {
  let (app, store, _) = test_app();
  store
    .insert(SyncConfig::new(1, "0 * * * *").with_enabled(false))
    .await;

  let (status, body) = send(&app, Method::POST, "/task/scheduler/execute-sync/99", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["code"], 404);

  // A disabled config is treated as not found as well
  let (status, _) = send(&app, Method::POST, "/task/scheduler/execute-sync/1", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_result_unknown_id_is_404() {
  let (app, _, _) = test_app();
  let (status, body) = send(
    &app,
    Method::GET,
    "/task/scheduler/task-result/nonexistent",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["msg"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_execute_all_enabled_reports_per_item() {
  let (app, store, runner) = test_app();
  store.insert(SyncConfig::new(1, "0 * * * *")).await;
  store.insert(SyncConfig::new(2, "0 * * * *")).await;
  runner.deny(2).await;

  let (status, body) = send(
    &app,
    Method::POST,
    "/task/scheduler/execute-all-enabled",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let outcomes = body["data"].as_array().unwrap();
  assert_eq!(outcomes.len(), 2);
  assert_eq!(outcomes[0]["status"], "submitted");
  assert_eq!(outcomes[1]["status"], "failed");
  assert!(outcomes[1]["error"].as_str().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_clear_tasks_resets_scheduler() {
  let (app, store, _) = test_app();
  store.insert(SyncConfig::new(1, "0 * * * *")).await;
  store.insert(SyncConfig::new(2, "30 * * * *")).await;
  send(&app, Method::POST, "/task/scheduler/refresh-tasks", None).await;

  let (status, body) = send(&app, Method::DELETE, "/task/scheduler/clear-tasks", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["removed_count"], 2);

  let (_, body) = send(&app, Method::GET, "/task/scheduler/task-status", None).await;
  assert_eq!(body["data"]["entry_count"], 0);
}
