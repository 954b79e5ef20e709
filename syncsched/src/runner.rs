//! 任务运行器模块
//! Task runner module
//!
//! 定义调度器消费的异步执行后端接口：提交立即返回任务 ID，
//! 执行结果随后通过结果查询观察。
//! Defines the asynchronous execution backend consumed by the scheduler:
//! submission returns a task ID immediately, completion is observed later
//! through a separate result lookup.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 任务执行状态
/// Task execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
  /// 已提交，等待执行
  /// Submitted, waiting for execution
  Pending,
  /// 执行中
  /// Running
  Started,
  /// 执行成功
  /// Completed successfully
  Success,
  /// 执行失败
  /// Failed
  Failure,
  /// 等待重试
  /// Waiting for retry
  Retry,
}

impl TaskState {
  /// 转换为字符串
  /// Convert to string
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Started => "STARTED",
      Self::Success => "SUCCESS",
      Self::Failure => "FAILURE",
      Self::Retry => "RETRY",
    }
  }

  /// 是否为终态
  /// Whether the state is terminal
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Success | Self::Failure)
  }
}

/// 任务执行结果
/// Task execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
  /// 任务 ID，每次提交唯一
  /// Task ID, unique per submission
  pub task_id: String,
  /// 当前状态
  /// Current state
  pub status: TaskState,
  /// 成功时的结果负载
  /// Result payload on success
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<serde_json::Value>,
  /// 失败时的错误信息
  /// Error message on failure
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl TaskResult {
  /// 创建待执行结果
  /// Create a pending result
  pub fn pending<I: Into<String>>(task_id: I) -> Self {
    Self {
      task_id: task_id.into(),
      status: TaskState::Pending,
      result: None,
      error: None,
    }
  }
}

/// 任务运行器特性，调度器消费的异步执行服务接口
/// Task runner trait, the asynchronous execution service consumed by the scheduler
#[async_trait]
pub trait TaskRunner: Send + Sync {
  /// 提交一次执行请求，非阻塞，返回运行器分配的任务 ID
  /// Submit one execution request, non-blocking, returns the runner-assigned task ID
  async fn submit(&self, config_id: i64) -> Result<String>;

  /// 读取任务当前结果，非阻塞；未知任务 ID 返回 `None`
  /// Read the task's current result, non-blocking; `None` for an unknown task ID
  async fn get_result(&self, task_id: &str) -> Result<Option<TaskResult>>;
}

/// 内存任务运行器状态
/// In-memory task runner state
#[derive(Default)]
struct RunnerState {
  /// 结果存储 - key: task_id
  /// Result store - key: task_id
  results: HashMap<String, TaskResult>,
  /// 提交记录，按提交顺序
  /// Submission log in submission order
  submissions: Vec<(String, i64)>,
  /// 提交被拒绝的配置 ID
  /// Config IDs whose submissions are rejected
  denied: HashSet<i64>,
}

/// 内存任务运行器实现
/// In-memory task runner implementation
///
/// 提交即记为 PENDING；测试可通过 `complete`/`fail` 驱动状态迁移，
/// 通过 `deny` 模拟入队失败。
/// Submissions are recorded as PENDING; tests drive state transitions via
/// `complete`/`fail` and simulate enqueue failures via `deny`.
#[derive(Default)]
pub struct MemoryTaskRunner {
  state: Arc<RwLock<RunnerState>>,
}

impl MemoryTaskRunner {
  /// 创建新的内存任务运行器
  /// Create a new in-memory task runner
  pub fn new() -> Self {
    Self::default()
  }

  /// 将任务标记为成功并写入结果负载
  /// Mark a task successful and record its result payload
  pub async fn complete(&self, task_id: &str, result: serde_json::Value) {
    if let Some(entry) = self.state.write().await.results.get_mut(task_id) {
      entry.status = TaskState::Success;
      entry.result = Some(result);
      entry.error = None;
    }
  }

  /// 将任务标记为失败并写入错误信息
  /// Mark a task failed and record its error message
  pub async fn fail<E: Into<String>>(&self, task_id: &str, error: E) {
    if let Some(entry) = self.state.write().await.results.get_mut(task_id) {
      entry.status = TaskState::Failure;
      entry.error = Some(error.into());
      entry.result = None;
    }
  }

  /// 拒绝指定配置的后续提交
  /// Reject further submissions for the given config
  pub async fn deny(&self, config_id: i64) {
    self.state.write().await.denied.insert(config_id);
  }

  /// 已提交的配置 ID 列表，按提交顺序
  /// Submitted config IDs in submission order
  pub async fn submitted_config_ids(&self) -> Vec<i64> {
    self
      .state
      .read()
      .await
      .submissions
      .iter()
      .map(|(_, id)| *id)
      .collect()
  }

  /// 提交总数
  /// Total submission count
  pub async fn submission_count(&self) -> usize {
    self.state.read().await.submissions.len()
  }
}

#[async_trait]
impl TaskRunner for MemoryTaskRunner {
  async fn submit(&self, config_id: i64) -> Result<String> {
    let mut state = self.state.write().await;
    if state.denied.contains(&config_id) {
      return Err(Error::submission(format!(
        "enqueue rejected for config {config_id}"
      )));
    }
    let task_id = Uuid::new_v4().to_string();
    state
      .results
      .insert(task_id.clone(), TaskResult::pending(&task_id));
    state.submissions.push((task_id.clone(), config_id));
    Ok(task_id)
  }

  async fn get_result(&self, task_id: &str) -> Result<Option<TaskResult>> {
    Ok(self.state.read().await.results.get(task_id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_task_state_strings_and_terminality() {
    assert_eq!(TaskState::Pending.as_str(), "PENDING");
    assert_eq!(TaskState::Success.as_str(), "SUCCESS");
    assert!(TaskState::Success.is_terminal());
    assert!(TaskState::Failure.is_terminal());
    assert!(!TaskState::Pending.is_terminal());
    assert!(!TaskState::Retry.is_terminal());

    let json = serde_json::to_string(&TaskState::Failure).unwrap();
    assert_eq!(json, "\"FAILURE\"");
  }

  #[tokio::test]
  async fn test_submit_assigns_unique_ids_and_pending_result() {
    let runner = MemoryTaskRunner::new();
    let a = runner.submit(1).await.unwrap();
    let b = runner.submit(1).await.unwrap();
    assert_ne!(a, b);

    let result = runner.get_result(&a).await.unwrap().unwrap();
    assert_eq!(result.status, TaskState::Pending);
    assert_eq!(runner.submitted_config_ids().await, vec![1, 1]);
  }

  #[tokio::test]
  async fn test_complete_and_fail_reach_terminal_states() {
    let runner = MemoryTaskRunner::new();
    let a = runner.submit(1).await.unwrap();
    let b = runner.submit(2).await.unwrap();

    runner.complete(&a, json!({"synced_files": 12})).await;
    runner.fail(&b, "remote unreachable").await;

    let a = runner.get_result(&a).await.unwrap().unwrap();
    assert_eq!(a.status, TaskState::Success);
    assert_eq!(a.result.unwrap()["synced_files"], 12);

    let b = runner.get_result(&b).await.unwrap().unwrap();
    assert_eq!(b.status, TaskState::Failure);
    assert_eq!(b.error.as_deref(), Some("remote unreachable"));
  }

  #[tokio::test]
  async fn test_denied_submission_fails_without_recording() {
    let runner = MemoryTaskRunner::new();
    runner.deny(7).await;

    let err = runner.submit(7).await.unwrap_err();
    assert!(matches!(err, Error::Submission(_)));
    assert_eq!(runner.submission_count().await, 0);
  }

  #[tokio::test]
  async fn test_unknown_task_id_yields_none() {
    let runner = MemoryTaskRunner::new();
    assert!(runner.get_result("missing").await.unwrap().is_none());
  }
}
