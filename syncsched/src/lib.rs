//! # Syncsched
//!
//! 基于 cron 的文件同步周期任务调度器
//! Cron-driven periodic task scheduler for file synchronization configs
//!
//! Syncsched 以数据库中的同步配置为期望状态，将内存中的定时触发器与之对账，
//! 并将到期的执行请求异步提交给任务运行器。
//! Syncsched treats sync configs held in storage as the desired state, reconciles
//! the in-memory periodic triggers against it, and hands due execution requests
//! off to an asynchronous task runner.
//!
//! ## 特性
//! ## Features
//!
//! - 运行期动态注册/注销周期任务
//!   - Dynamic registration and removal of periodic triggers at runtime
//! - 五段式 cron 表达式解析与校验（`*`、列表、区间、步进）
//!   - Five-field cron expression parsing and validation (`*`, lists, ranges, steps)
//! - 对账式同步：新增/更新/移除计数与逐项错误收集
//!   - Reconciliation-style sync with added/updated/removed counts and per-config errors
//! - 至少一次、不去重的触发语义
//!   - At-least-once, non-deduplicated firing semantics
//! - 立即执行与批量立即执行
//!   - Immediate execution for one config or all enabled configs
//!
//! ## 快速开始
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syncsched::config::SchedulerConfig;
//! use syncsched::runner::MemoryTaskRunner;
//! use syncsched::scheduler::SyncScheduler;
//! use syncsched::store::{MemoryConfigStore, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryConfigStore::new());
//!     store.insert(SyncConfig::new(1, "*/30 * * * *")).await;
//!
//!     let runner = Arc::new(MemoryTaskRunner::new());
//!     let scheduler = SyncScheduler::new(store, runner, SchedulerConfig::default());
//!
//!     // 从存储装载启用的配置并启动定时循环
//!     // Load enabled configs from storage and start the timing loop
//!     let report = scheduler.sync_all_tasks_from_db().await;
//!     println!("added {} triggers", report.added_count);
//!     scheduler.start().await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cron;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod store;
