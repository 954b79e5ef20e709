//! 周期性同步任务调度器
//! Periodic sync task scheduler
//!
//! 调度器持有「配置 ID → 已安装触发器」的内存映射，并将其与存储中
//! 启用的同步配置对账。触发器到期时向任务运行器提交一次执行请求，
//! 不等待完成；同一配置的重叠执行不做串行化（至少一次语义）。
//! The scheduler owns the in-memory map from config ID to installed trigger and
//! reconciles it against the enabled sync configs in storage. When a trigger
//! fires, one execution request is submitted to the task runner without waiting
//! for completion; overlapping runs of the same config are not serialized
//! (at-least-once semantics).
//!
//! 并发约定：条目映射是本模块唯一的共享可变状态，安装、替换、取消与
//! 对账遍历都在同一把锁下进行；存储读取和运行器提交都在锁外完成。
//! Concurrency discipline: the entry map is the only shared mutable state here;
//! install, replace, cancel and reconciliation iteration all happen under one
//! lock, while storage reads and runner submissions happen outside it.

use crate::config::SchedulerConfig;
use crate::cron::{self, CronSchedule, CronValidation};
use crate::error::{Error, Result};
use crate::runner::TaskRunner;
use crate::store::{ConfigStore, SyncConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 已安装的周期触发器条目
/// An installed periodic trigger entry
///
/// 不变式：每个配置 ID 至多一个条目。
/// Invariant: at most one entry per config ID.
#[derive(Debug, Clone)]
pub struct ScheduledEntry {
  /// 配置 ID
  /// Config ID
  pub config_id: i64,
  /// 安装时的 cron 表达式原文，用于检测配置变更
  /// Cron expression text at install time, used to detect config changes
  pub cron_expression: String,
  /// 解析后的调度
  /// Parsed schedule
  pub schedule: CronSchedule,
  /// 下次触发时间
  /// Next firing time
  pub next_tick: Option<DateTime<Utc>>,
}

impl ScheduledEntry {
  fn new(config: &SyncConfig, schedule: CronSchedule, now: DateTime<Utc>) -> Self {
    let next_tick = schedule.next_after(now);
    Self {
      config_id: config.id,
      cron_expression: config.cron.clone(),
      schedule,
      next_tick,
    }
  }
}

/// 对账结果
/// Reconciliation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
  /// 对账是否执行成功（存储读取失败时为 false）
  /// Whether reconciliation ran successfully (false when the storage fetch failed)
  pub success: bool,
  /// 新安装的触发器数量
  /// Number of newly installed triggers
  pub added_count: usize,
  /// 因 cron 变更而替换的触发器数量
  /// Number of triggers replaced due to cron changes
  pub updated_count: usize,
  /// 被取消移除的触发器数量
  /// Number of triggers cancelled and removed
  pub removed_count: usize,
  /// 逐配置错误列表
  /// Per-config error list
  pub errors: Vec<String>,
}

impl SyncReport {
  fn failed<S: Into<String>>(message: S) -> Self {
    Self {
      success: false,
      added_count: 0,
      updated_count: 0,
      removed_count: 0,
      errors: vec![message.into()],
    }
  }
}

/// 单个已安装触发器的状态
/// Status of one installed trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStatus {
  /// 配置 ID
  /// Config ID
  pub config_id: i64,
  /// cron 表达式
  /// Cron expression
  pub cron: String,
  /// 下次触发时间
  /// Next firing time
  pub next_tick: Option<DateTime<Utc>>,
}

/// 调度器状态快照
/// Scheduler status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
  /// 已安装触发器的配置 ID 集合（升序）
  /// Config IDs with installed triggers (ascending)
  pub scheduled_config_ids: Vec<i64>,
  /// 条目数量
  /// Entry count
  pub entry_count: usize,
  /// 各条目明细
  /// Per-entry details
  pub entries: Vec<EntryStatus>,
}

/// 单个配置的立即提交结果
/// Immediate submission outcome for one config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
  /// 配置 ID
  /// Config ID
  pub config_id: i64,
  /// 提交状态，`submitted` 或 `failed`
  /// Submission status, `submitted` or `failed`
  pub status: String,
  /// 成功时运行器分配的任务 ID
  /// Runner-assigned task ID on success
  #[serde(skip_serializing_if = "Option::is_none")]
  pub task_id: Option<String>,
  /// 失败时的错误信息
  /// Error message on failure
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl SubmitOutcome {
  fn submitted(config_id: i64, task_id: String) -> Self {
    Self {
      config_id,
      status: "submitted".to_string(),
      task_id: Some(task_id),
      error: None,
    }
  }

  fn failed(config_id: i64, error: String) -> Self {
    Self {
      config_id,
      status: "failed".to_string(),
      task_id: None,
      error: Some(error),
    }
  }
}

/// 同步任务调度器
/// Sync task scheduler
#[derive(Clone)]
pub struct SyncScheduler {
  /// 配置存储（只读协作方）
  /// Config store (read-only collaborator)
  store: Arc<dyn ConfigStore>,
  /// 任务运行器（异步执行后端）
  /// Task runner (asynchronous execution backend)
  runner: Arc<dyn TaskRunner>,
  /// 调度器配置
  /// Scheduler configuration
  config: SchedulerConfig,
  /// 条目映射（config_id -> ScheduledEntry），唯一的共享可变状态
  /// Entry map (config_id -> ScheduledEntry), the only shared mutable state
  entries: Arc<Mutex<HashMap<i64, ScheduledEntry>>>,
  /// 运行状态标志
  /// Running flag
  running: Arc<AtomicBool>,
  /// 唤醒定时循环的通知
  /// Notification to wake the timing loop
  notify: Arc<Notify>,
  /// 定时循环任务句柄
  /// Timing loop task handle
  handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl SyncScheduler {
  /// 创建调度器
  /// Create a scheduler
  pub fn new(
    store: Arc<dyn ConfigStore>,
    runner: Arc<dyn TaskRunner>,
    config: SchedulerConfig,
  ) -> Self {
    Self {
      store,
      runner,
      config,
      entries: Arc::new(Mutex::new(HashMap::new())),
      running: Arc::new(AtomicBool::new(false)),
      notify: Arc::new(Notify::new()),
      handle: Arc::new(tokio::sync::Mutex::new(None)),
    }
  }

  fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<i64, ScheduledEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| Error::internal(format!("entry map lock poisoned: {e}")))
  }

  /// 校验 cron 表达式并返回后续执行时间预览
  /// Validate a cron expression and return an occurrence preview
  pub fn validate_cron_expression(&self, expr: &str) -> CronValidation {
    cron::validate_expression(expr, self.config.preview_count, Utc::now())
  }

  /// 从存储对账所有触发器
  /// Reconcile all triggers from storage
  ///
  /// 先在锁外读取启用配置并解析 cron，再在锁下安装/替换/移除：
  /// 新配置安装计入 added；表达式变更的替换计入 updated；不再启用的
  /// 取消移除计入 removed。单个配置的 cron 解析失败只记入 errors。
  /// Enabled configs are fetched and their crons parsed outside the lock, then
  /// install/replace/remove happens under it: new configs count as added,
  /// expression changes as updated, no-longer-enabled removals as removed.
  /// A single config's cron parse failure only lands in `errors`.
  pub async fn sync_all_tasks_from_db(&self) -> SyncReport {
    let configs = match self.store.list_enabled().await {
      Ok(configs) => configs,
      Err(e) => {
        error!(error = %e, "failed to fetch enabled configs for reconciliation");
        return SyncReport::failed(format!("failed to fetch enabled configs: {e}"));
      }
    };

    let now = Utc::now();
    let mut parsed = Vec::with_capacity(configs.len());
    let mut errors = Vec::new();
    for config in configs {
      match config.cron.parse::<CronSchedule>() {
        Ok(schedule) => parsed.push((config, schedule)),
        Err(e) => {
          warn!(config_id = config.id, error = %e, "skipping config with invalid cron");
          errors.push(format!("config {}: {e}", config.id));
        }
      }
    }

    let mut entries = match self.lock_entries() {
      Ok(entries) => entries,
      Err(e) => return SyncReport::failed(e.to_string()),
    };

    let desired: HashSet<i64> = parsed.iter().map(|(config, _)| config.id).collect();
    let mut added = 0;
    let mut updated = 0;
    for (config, schedule) in parsed {
      match entries.get(&config.id) {
        Some(existing) if existing.cron_expression == config.cron => {}
        Some(_) => {
          // 表达式变化：取消旧触发器，安装新触发器
          // Expression changed: cancel the old trigger and install a new one
          entries.insert(config.id, ScheduledEntry::new(&config, schedule, now));
          updated += 1;
        }
        None => {
          entries.insert(config.id, ScheduledEntry::new(&config, schedule, now));
          added += 1;
        }
      }
    }

    // 不在启用集合中的条目（被禁用、删除或表达式已失效）取消移除
    // Entries no longer in the desired set (disabled, deleted, or whose new
    // expression failed to parse) are cancelled and removed
    let stale: Vec<i64> = entries
      .keys()
      .filter(|id| !desired.contains(id))
      .copied()
      .collect();
    let removed = stale.len();
    for id in stale {
      entries.remove(&id);
    }
    drop(entries);

    // 唤醒定时循环重新计算最近触发时间
    // Wake the timing loop to recompute the nearest firing time
    self.notify.notify_one();

    info!(
      added, updated, removed,
      error_count = errors.len(),
      "trigger reconciliation finished"
    );
    SyncReport {
      success: true,
      added_count: added,
      updated_count: updated,
      removed_count: removed,
      errors,
    }
  }

  /// 获取调度器状态快照
  /// Take a scheduler status snapshot
  ///
  /// 在锁下复制快照，序列化在锁外进行；除条目映射外不做任何 I/O。
  /// Copies a snapshot under the lock so serialization happens outside it;
  /// touches nothing but the entry map.
  pub fn get_task_status(&self) -> Result<TaskStatus> {
    let entries = self.lock_entries()?;
    let mut details: Vec<EntryStatus> = entries
      .values()
      .map(|entry| EntryStatus {
        config_id: entry.config_id,
        cron: entry.cron_expression.clone(),
        next_tick: entry.next_tick,
      })
      .collect();
    drop(entries);

    details.sort_by_key(|entry| entry.config_id);
    Ok(TaskStatus {
      scheduled_config_ids: details.iter().map(|entry| entry.config_id).collect(),
      entry_count: details.len(),
      entries: details,
    })
  }

  /// 取消全部触发器并清空条目映射，返回移除数量
  /// Cancel every trigger and empty the entry map, returns the removed count
  pub fn clear_all_tasks(&self) -> Result<usize> {
    let mut entries = self.lock_entries()?;
    let removed = entries.len();
    entries.clear();
    drop(entries);

    self.notify.notify_one();
    info!(removed, "cleared all scheduled triggers");
    Ok(removed)
  }

  /// 立即执行一个配置的同步，忽略其调度计划
  /// Execute one config's sync immediately, regardless of its schedule
  ///
  /// 配置不存在或未启用时返回 `ConfigNotFound`；不改动条目映射。
  /// Returns `ConfigNotFound` when the config is absent or disabled; the entry
  /// map is left untouched.
  pub async fn execute_sync_now(&self, config_id: i64) -> Result<String> {
    let config = self
      .store
      .get(config_id)
      .await?
      .ok_or(Error::ConfigNotFound { id: config_id })?;
    if !config.enabled {
      return Err(Error::ConfigNotFound { id: config_id });
    }

    let task_id = self.runner.submit(config_id).await?;
    info!(config_id, task_id = %task_id, "immediate sync submitted");
    Ok(task_id)
  }

  /// 立即为所有启用配置各提交一次执行
  /// Submit one immediate execution for every enabled config
  ///
  /// 单个配置的提交失败逐项上报，不影响其余提交。
  /// A single config's submission failure is reported per item and does not
  /// fail sibling submissions.
  pub async fn execute_all_enabled_now(&self) -> Result<Vec<SubmitOutcome>> {
    let configs = self.store.list_enabled().await?;
    let mut outcomes = Vec::with_capacity(configs.len());
    for config in configs {
      match self.runner.submit(config.id).await {
        Ok(task_id) => {
          debug!(config_id = config.id, task_id = %task_id, "batch sync submitted");
          outcomes.push(SubmitOutcome::submitted(config.id, task_id));
        }
        Err(e) => {
          warn!(config_id = config.id, error = %e, "batch sync submission failed");
          outcomes.push(SubmitOutcome::failed(config.id, e.to_string()));
        }
      }
    }
    Ok(outcomes)
  }

  /// 提交所有到期触发器的执行请求并推进其下次触发时间
  /// Submit executions for all due triggers and advance their next firing times
  ///
  /// 到期条目在锁下收集并推进，提交在锁外逐个进行；提交失败只记录
  /// 日志，触发器保持安装等待下次触发。返回本轮提交的任务 ID。
  /// Due entries are collected and advanced under the lock; submissions happen
  /// outside it. A failed submission is only logged and the trigger stays
  /// installed for its next occurrence. Returns the task IDs submitted this pass.
  #[cfg_attr(not(test), doc(hidden))]
  pub async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
    let due: Vec<i64> = {
      let mut entries = self.lock_entries()?;
      let mut due = Vec::new();
      for entry in entries.values_mut() {
        if let Some(next) = entry.next_tick {
          if next <= now {
            due.push(entry.config_id);
            entry.next_tick = entry.schedule.next_after(now);
          }
        }
      }
      due
    };

    let mut task_ids = Vec::with_capacity(due.len());
    for config_id in due {
      match self.runner.submit(config_id).await {
        Ok(task_id) => {
          debug!(config_id, task_id = %task_id, "scheduled sync submitted");
          task_ids.push(task_id);
        }
        Err(e) => {
          warn!(config_id, error = %e, "scheduled submission failed, trigger stays installed");
        }
      }
    }
    Ok(task_ids)
  }

  /// 最近一次触发时间，用于计算循环睡眠时长
  /// Nearest firing time, used to size the loop sleep
  fn next_wakeup(&self) -> Option<DateTime<Utc>> {
    let entries = self.entries.lock().ok()?;
    entries.values().filter_map(|entry| entry.next_tick).min()
  }

  /// 启动后台定时循环，重复调用无效果
  /// Start the background timing loop; repeated calls have no effect
  pub async fn start(&self) {
    if self.running.swap(true, Ordering::SeqCst) {
      return;
    }

    let scheduler = self.clone();
    let handle = tokio::spawn(async move {
      info!("sync scheduler loop started");
      loop {
        if !scheduler.running.load(Ordering::Relaxed) {
          break;
        }
        if let Err(e) = scheduler.dispatch_due(Utc::now()).await {
          error!(error = %e, "dispatch pass failed");
        }
        let sleep_dur = match scheduler.next_wakeup() {
          Some(next) => (next - Utc::now()).to_std().unwrap_or(Duration::ZERO),
          None => scheduler.config.tick_fallback_interval,
        };
        tokio::select! {
          _ = tokio::time::sleep(sleep_dur) => {}
          _ = scheduler.notify.notified() => {}
        }
      }
      info!("sync scheduler loop stopped");
    });

    *self.handle.lock().await = Some(handle);
  }

  /// 停止后台定时循环并等待其退出
  /// Stop the background timing loop and wait for it to exit
  ///
  /// 已经在途的提交允许完成；停止后不再有新的触发。
  /// An in-flight submission is allowed to complete; no further firings happen
  /// after stop returns.
  pub async fn stop(&self) {
    self.running.store(false, Ordering::SeqCst);
    self.notify.notify_one();
    let handle = self.handle.lock().await.take();
    if let Some(handle) = handle {
      let _ = handle.await;
    }
  }

  /// 是否正在运行
  /// Whether the loop is running
  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Relaxed)
  }
}
