//! 内存状态存储
//!
//! 单把 RwLock 保证同 key 的 save 原子可见；只适合短生命周期部署或测试。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::conversation::ConversationState;
use crate::store::{StateStore, StoreError};

/// 内存实现：conversation_id -> 状态快照
#[derive(Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.states.read().await.get(conversation_id).cloned())
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(conversation_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_id_returns_none() {
        let store = MemoryStateStore::new();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_is_equal() {
        let store = MemoryStateStore::new();
        let mut state = ConversationState::new("c1");
        state.push_user("hola");
        state.record_error();

        store.save("c1", &state).await.unwrap();
        let loaded = store.load("c1").await.unwrap().unwrap();
        assert_eq!(state, loaded);
    }
}
