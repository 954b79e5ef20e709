//! 错误处理模块
//! Error handling module
//!
//! 定义了 Syncsched 库中使用的各种错误类型
//! Defines various error types used in the Syncsched library

use thiserror::Error;

/// Syncsched 库的结果类型
/// Result type for the Syncsched library
pub type Result<T> = std::result::Result<T, Error>;

/// Syncsched 错误类型
/// Syncsched error type
#[derive(Error, Debug)]
pub enum Error {
  /// 无效的 cron 表达式
  /// Invalid cron expression
  #[error("Invalid cron expression {expr:?}: {message}")]
  InvalidCron { expr: String, message: String },

  /// 同步配置未找到（不存在或未启用）
  /// Sync config not found (absent or disabled)
  #[error("Sync config not found or disabled: {id}")]
  ConfigNotFound { id: i64 },

  /// 任务结果未找到
  /// Task result not found
  #[error("Task result not found: {task_id}")]
  ResultNotFound { task_id: String },

  /// 配置存储错误
  /// Config storage error
  #[error("Storage error: {0}")]
  Storage(String),

  /// 任务运行器提交错误
  /// Task runner submission error
  #[error("Runner submission error: {0}")]
  Submission(String),

  /// 序列化错误
  /// Serialization error
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// IO 错误
  /// IO error
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// 内部错误（如锁中毒）
  /// Internal error (e.g. lock poisoning)
  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  /// 创建无效 cron 表达式错误
  /// Create an invalid cron expression error
  pub fn invalid_cron<E: Into<String>, M: Into<String>>(expr: E, message: M) -> Self {
    Self::InvalidCron {
      expr: expr.into(),
      message: message.into(),
    }
  }

  /// 创建存储错误
  /// Create a storage error
  pub fn storage<S: Into<String>>(message: S) -> Self {
    Self::Storage(message.into())
  }

  /// 创建提交错误
  /// Create a submission error
  pub fn submission<S: Into<String>>(message: S) -> Self {
    Self::Submission(message.into())
  }

  /// 创建内部错误
  /// Create an internal error
  pub fn internal<S: Into<String>>(message: S) -> Self {
    Self::Internal(message.into())
  }

  /// 检查是否为可重试错误
  /// Check if the error is retriable
  pub fn is_retriable(&self) -> bool {
    matches!(
      self,
      Error::Storage(_) | Error::Submission(_) | Error::Io(_)
    )
  }
}
