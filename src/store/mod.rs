//! 会话状态存储抽象层
//!
//! 定义统一的检查点接口（load/save），支持内存和 SQLite 两种实现。
//! load/save 对同一 key 原子：并发读者看不到半写状态。blob 的 schema
//! 版本由存储层负责（CheckpointEnvelope），引擎不感知。

pub mod memory;
#[cfg(feature = "async-sqlite")]
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ConversationState;

pub use memory::MemoryStateStore;
#[cfg(feature = "async-sqlite")]
pub use sqlite::SqliteStateStore;

/// 当前检查点 blob 的 schema 版本
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// 存储错误；对引擎而言任何存储失败都意味着本回合不提交
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("checkpoint codec error: {0}")]
    Codec(String),
}

/// 持久化的检查点信封：版本号 + 状态
#[derive(Serialize, Deserialize)]
pub struct CheckpointEnvelope {
    pub version: u32,
    pub state: ConversationState,
}

impl CheckpointEnvelope {
    pub fn wrap(state: &ConversationState) -> Self {
        Self {
            version: CHECKPOINT_SCHEMA_VERSION,
            state: state.clone(),
        }
    }

    pub fn to_blob(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// 反序列化并校验版本；未知版本拒绝加载（迁移属于存储层的运维操作）
    pub fn from_blob(blob: &str) -> Result<ConversationState, StoreError> {
        let envelope: CheckpointEnvelope =
            serde_json::from_str(blob).map_err(|e| StoreError::Codec(e.to_string()))?;
        if envelope.version != CHECKPOINT_SCHEMA_VERSION {
            return Err(StoreError::Codec(format!(
                "unsupported checkpoint schema version {}",
                envelope.version
            )));
        }
        Ok(envelope.state)
    }
}

/// 状态存储接口
///
/// 未知 conversation_id 时 load 返回 None，由引擎构造全新状态。
/// 实现必须能承受进程重启（内存实现只适合短生命周期部署，接口不做该假设）。
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>, StoreError>;

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), StoreError>;
}

/// 创建状态存储
///
/// 如果提供了 db_path 且启用了 async-sqlite feature，则使用 SQLite 持久化；否则使用内存存储
pub async fn create_state_store(db_path: Option<&std::path::Path>) -> Arc<dyn StateStore> {
    #[cfg(feature = "async-sqlite")]
    if let Some(path) = db_path {
        match SqliteStateStore::new(path).await {
            Ok(store) => {
                tracing::info!("Using SQLite checkpoint store: {:?}", path);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Failed to open SQLite store, falling back to memory: {}", e);
            }
        }
    }

    #[cfg(not(feature = "async-sqlite"))]
    if db_path.is_some() {
        tracing::warn!(
            "Persistent checkpoint store requested but async-sqlite feature not enabled, using memory store"
        );
    }

    tracing::info!("Using in-memory checkpoint store");
    Arc::new(MemoryStateStore::new())
}
