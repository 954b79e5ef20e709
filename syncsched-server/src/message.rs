//! JSON envelope and payload types for the scheduler API

use serde::{Deserialize, Serialize};

/// Uniform response envelope
///
/// Every endpoint wraps its payload in `{ code, msg, data }` so operator
/// tooling can treat success and failure uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
  /// Status code, mirrors the HTTP status
  pub code: u16,
  /// Human-readable message
  pub msg: String,
  /// Payload, absent on errors
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
}

impl<T> ApiResponse<T> {
  /// Successful envelope wrapping `data`
  pub fn success(data: T) -> Self {
    Self {
      code: 200,
      msg: "Success".to_string(),
      data: Some(data),
    }
  }

  /// Error envelope without payload
  pub fn error<M: Into<String>>(code: u16, msg: M) -> Self {
    Self {
      code,
      msg: msg.into(),
      data: None,
    }
  }
}

/// Payload for `DELETE /task/scheduler/clear-tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedTasks {
  /// Number of triggers cancelled
  pub removed_count: usize,
}

/// Payload for `POST /task/scheduler/execute-sync/{config_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedTask {
  /// Runner-assigned task ID
  pub task_id: String,
  /// Config the execution was submitted for
  pub config_id: i64,
  /// Always `submitted` on success
  pub status: String,
}
