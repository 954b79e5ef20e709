//! Scheduler API server implementation
//!
//! Builds the Axum router for the scheduler operations surface and owns the
//! server lifecycle: one reconciliation pass at startup, the background timing
//! loop while serving, and a clean scheduler stop on shutdown.

use crate::error::{Error, Result};
use crate::message::{ApiResponse, ClearedTasks, SubmittedTask};
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use syncsched::cron::CronValidation;
use syncsched::error::Error as CoreError;
use syncsched::runner::{TaskResult, TaskRunner};
use syncsched::scheduler::{SubmitOutcome, SyncReport, SyncScheduler, TaskStatus};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the API handlers
pub struct AppState {
  /// The scheduler core
  pub scheduler: SyncScheduler,
  /// The task runner, queried directly for task results
  pub runner: Arc<dyn TaskRunner>,
}

/// Build the scheduler API router
pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/task/scheduler/refresh-tasks", post(refresh_tasks))
    .route("/task/scheduler/task-status", get(task_status))
    .route("/task/scheduler/validate-cron", post(validate_cron))
    .route("/task/scheduler/clear-tasks", delete(clear_tasks))
    .route(
      "/task/scheduler/execute-sync/{config_id}",
      post(execute_sync),
    )
    .route(
      "/task/scheduler/execute-all-enabled",
      post(execute_all_enabled),
    )
    .route("/task/scheduler/task-result/{task_id}", get(task_result))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Reconcile triggers against the config storage
async fn refresh_tasks(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SyncReport>> {
  let report = state.scheduler.sync_all_tasks_from_db().await;
  Json(ApiResponse::success(report))
}

/// Point-in-time scheduler state snapshot
async fn task_status(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<TaskStatus>>> {
  let status = state.scheduler.get_task_status()?;
  Ok(Json(ApiResponse::success(status)))
}

/// Validate a cron expression sent as a JSON string body
///
/// Malformed expressions are a normal outcome here: the result is reported in
/// the payload with `valid: false`, not as an HTTP error.
async fn validate_cron(
  State(state): State<Arc<AppState>>,
  Json(expr): Json<String>,
) -> Json<ApiResponse<CronValidation>> {
  let validation = state.scheduler.validate_cron_expression(&expr);
  Json(ApiResponse::success(validation))
}

/// Cancel every installed trigger
async fn clear_tasks(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<ClearedTasks>>> {
  let removed_count = state.scheduler.clear_all_tasks()?;
  Ok(Json(ApiResponse::success(ClearedTasks { removed_count })))
}

/// Submit one immediate execution for a config, bypassing its schedule
async fn execute_sync(
  State(state): State<Arc<AppState>>,
  Path(config_id): Path<i64>,
) -> Result<Json<ApiResponse<SubmittedTask>>> {
  let task_id = state.scheduler.execute_sync_now(config_id).await?;
  Ok(Json(ApiResponse::success(SubmittedTask {
    task_id,
    config_id,
    status: "submitted".to_string(),
  })))
}

/// Submit one immediate execution per enabled config
async fn execute_all_enabled(
  State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<SubmitOutcome>>>> {
  let outcomes = state.scheduler.execute_all_enabled_now().await?;
  Ok(Json(ApiResponse::success(outcomes)))
}

/// Current result for a submitted task
async fn task_result(
  State(state): State<Arc<AppState>>,
  Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<TaskResult>>> {
  let result = state
    .runner
    .get_result(&task_id)
    .await
    .map_err(Error::Scheduler)?
    .ok_or(CoreError::ResultNotFound { task_id })?;
  Ok(Json(ApiResponse::success(result)))
}

/// Scheduler API server
///
/// Wraps the scheduler core and the task runner behind the HTTP operations
/// surface. On startup it performs one reconciliation pass against storage and
/// starts the timing loop, so triggers are live before the first request.
pub struct SchedulerServer {
  /// Server address
  addr: SocketAddr,
  /// The scheduler core
  scheduler: SyncScheduler,
  /// The task runner backing result lookups
  runner: Arc<dyn TaskRunner>,
}

impl SchedulerServer {
  /// Create a new SchedulerServer
  pub fn new<A: Into<SocketAddr>>(
    addr: A,
    scheduler: SyncScheduler,
    runner: Arc<dyn TaskRunner>,
  ) -> Self {
    Self {
      addr: addr.into(),
      scheduler,
      runner,
    }
  }

  /// Run the server
  pub async fn run(self) -> Result<()> {
    // Load triggers from storage before accepting traffic
    let report = self.scheduler.sync_all_tasks_from_db().await;
    info!(
      added = report.added_count,
      errors = report.errors.len(),
      "startup trigger reconciliation finished"
    );
    self.scheduler.start().await;

    let state = Arc::new(AppState {
      scheduler: self.scheduler.clone(),
      runner: self.runner,
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(self.addr)
      .await
      .map_err(Error::Io)?;
    info!("Syncsched server listening on {}", self.addr);

    let result = axum::serve(listener, app)
      .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal, stopping server...");
      })
      .await
      .map_err(Error::Io);

    self.scheduler.stop().await;
    info!("Scheduler loop stopped");

    result
  }
}
