//! 配置模块
//! Configuration module
//!
//! 定义调度器的配置选项
//! Defines configuration options for the scheduler

use std::time::Duration;

/// 调度器配置
/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  /// 无任何触发器时定时循环的兜底唤醒间隔
  /// Fallback wake-up interval for the timing loop when no trigger is installed
  pub tick_fallback_interval: Duration,
  /// cron 校验时预览的后续执行次数
  /// Number of upcoming occurrences previewed during cron validation
  pub preview_count: usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      tick_fallback_interval: Duration::from_secs(10),
      preview_count: 5,
    }
  }
}

impl SchedulerConfig {
  /// 创建新的调度器配置
  /// Create a new scheduler configuration
  pub fn new() -> Self {
    Self::default()
  }

  /// 设置兜底唤醒间隔
  /// Set the fallback wake-up interval
  pub fn tick_fallback_interval(mut self, interval: Duration) -> Self {
    self.tick_fallback_interval = interval;
    self
  }

  /// 设置校验预览数量
  /// Set the validation preview count
  pub fn preview_count(mut self, count: usize) -> Self {
    self.preview_count = count.max(1);
    self
  }
}
