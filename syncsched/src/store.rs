//! 配置存储模块
//! Config storage module
//!
//! 定义同步配置记录与只读存储抽象。配置由外部管理端创建和修改，
//! 调度器只读取，不回写。
//! Defines the sync config record and the read-only storage abstraction.
//! Configs are created and edited by an external admin surface; the scheduler
//! only reads them and never writes back.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 文件同步配置记录
/// File sync config record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
  /// 配置唯一 ID
  /// Unique config ID
  pub id: i64,
  /// cron 表达式（分 时 日 月 周）
  /// Cron expression (minute hour day month day-of-week)
  pub cron: String,
  /// 是否启用
  /// Whether enabled
  pub enabled: bool,
  /// 备注
  /// Remark
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remark: Option<String>,
}

impl SyncConfig {
  /// 创建启用状态的同步配置
  /// Create an enabled sync config
  pub fn new<C: Into<String>>(id: i64, cron: C) -> Self {
    Self {
      id,
      cron: cron.into(),
      enabled: true,
      remark: None,
    }
  }

  /// 设置备注
  /// Set the remark
  pub fn with_remark<R: Into<String>>(mut self, remark: R) -> Self {
    self.remark = Some(remark.into());
    self
  }

  /// 设置启用状态
  /// Set the enabled flag
  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }
}

/// 配置存储特性，调度器的只读存储接口
/// Config store trait, the scheduler's read-only storage interface
#[async_trait]
pub trait ConfigStore: Send + Sync {
  /// 获取所有启用的同步配置
  /// Fetch all enabled sync configs
  async fn list_enabled(&self) -> Result<Vec<SyncConfig>>;

  /// 按 ID 获取配置
  /// Fetch one config by ID
  async fn get(&self, id: i64) -> Result<Option<SyncConfig>>;
}

/// 内存配置存储实现
/// In-memory config store implementation
///
/// 用于测试和演示，接口与数据库存储保持一致。
/// Used for tests and demos; presents the same interface as a database store.
#[derive(Default)]
pub struct MemoryConfigStore {
  configs: Arc<RwLock<HashMap<i64, SyncConfig>>>,
}

impl MemoryConfigStore {
  /// 创建新的内存配置存储
  /// Create a new in-memory config store
  pub fn new() -> Self {
    Self::default()
  }

  /// 写入或覆盖一条配置
  /// Insert or replace a config
  pub async fn insert(&self, config: SyncConfig) {
    self.configs.write().await.insert(config.id, config);
  }

  /// 删除一条配置
  /// Remove a config
  pub async fn remove(&self, id: i64) -> Option<SyncConfig> {
    self.configs.write().await.remove(&id)
  }

  /// 修改启用状态
  /// Change the enabled flag
  pub async fn set_enabled(&self, id: i64, enabled: bool) {
    if let Some(config) = self.configs.write().await.get_mut(&id) {
      config.enabled = enabled;
    }
  }

  /// 修改 cron 表达式
  /// Change the cron expression
  pub async fn set_cron<C: Into<String>>(&self, id: i64, cron: C) {
    if let Some(config) = self.configs.write().await.get_mut(&id) {
      config.cron = cron.into();
    }
  }

  /// 配置总数
  /// Total number of configs
  pub async fn len(&self) -> usize {
    self.configs.read().await.len()
  }

  /// 是否为空
  /// Whether the store is empty
  pub async fn is_empty(&self) -> bool {
    self.configs.read().await.is_empty()
  }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
  async fn list_enabled(&self) -> Result<Vec<SyncConfig>> {
    let configs = self.configs.read().await;
    let mut enabled: Vec<SyncConfig> = configs.values().filter(|c| c.enabled).cloned().collect();
    enabled.sort_by_key(|c| c.id);
    Ok(enabled)
  }

  async fn get(&self, id: i64) -> Result<Option<SyncConfig>> {
    Ok(self.configs.read().await.get(&id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_insert_and_get() {
    let store = MemoryConfigStore::new();
    store
      .insert(SyncConfig::new(1, "*/5 * * * *").with_remark("daily sync"))
      .await;

    let config = store.get(1).await.unwrap().unwrap();
    assert_eq!(config.cron, "*/5 * * * *");
    assert_eq!(config.remark.as_deref(), Some("daily sync"));
    assert!(config.enabled);
    assert!(store.get(2).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_list_enabled_filters_disabled() {
    let store = MemoryConfigStore::new();
    store.insert(SyncConfig::new(1, "0 * * * *")).await;
    store
      .insert(SyncConfig::new(2, "0 0 * * *").with_enabled(false))
      .await;
    store.insert(SyncConfig::new(3, "30 2 * * *")).await;

    let enabled = store.list_enabled().await.unwrap();
    let ids: Vec<i64> = enabled.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[tokio::test]
  async fn test_set_enabled_and_set_cron() {
    let store = MemoryConfigStore::new();
    store.insert(SyncConfig::new(1, "0 * * * *")).await;

    store.set_enabled(1, false).await;
    assert!(store.list_enabled().await.unwrap().is_empty());

    store.set_enabled(1, true).await;
    store.set_cron(1, "15 * * * *").await;
    let config = store.get(1).await.unwrap().unwrap();
    assert_eq!(config.cron, "15 * * * *");
  }
}
