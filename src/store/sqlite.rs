//! SQLite 状态存储
//!
//! 检查点以版本化 JSON blob 存入单表，INSERT OR REPLACE 单语句写入保证
//! 同 key 原子；服务重启后 load 即可恢复会话（断点续跑）。

#![cfg(feature = "async-sqlite")]

use std::path::Path;

use async_trait::async_trait;
use sqlx::Row;

use crate::conversation::ConversationState;
use crate::store::{CheckpointEnvelope, StateStore, StoreError};

/// SQLite 实现：conversations 表按 conversation_id 存检查点 blob
pub struct SqliteStateStore {
    pool: sqlx::sqlite::SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT PRIMARY KEY,
                checkpoint TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let row = sqlx::query("SELECT checkpoint FROM conversations WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => {
                let blob: String = row.get("checkpoint");
                Ok(Some(CheckpointEnvelope::from_blob(&blob)?))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), StoreError> {
        let blob = CheckpointEnvelope::wrap(state).to_blob()?;
        let now = chrono::Utc::now().to_rfc3339();

        // 单语句 upsert：并发读者要么看到旧检查点，要么看到新检查点
        sqlx::query(
            "INSERT OR REPLACE INTO conversations (conversation_id, checkpoint, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(&blob)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_checkpoint_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_conversations.db");

        let store = SqliteStateStore::new(&db_path).await.unwrap();

        let mut state = ConversationState::new("549111234567");
        state.push_user("busco laptops");
        state.record_handler("product_agent");
        state.record_error();
        store.save("549111234567", &state).await.unwrap();
        store.close().await;

        // 模拟进程重启
        let store2 = SqliteStateStore::new(&db_path).await.unwrap();
        let restored = store2.load("549111234567").await.unwrap().unwrap();
        assert_eq!(state, restored);
        assert_eq!(restored.error_count, 1);
        assert_eq!(restored.handler_history, vec!["product_agent"]);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_overwrite.db");
        let store = SqliteStateStore::new(&db_path).await.unwrap();

        let mut state = ConversationState::new("c1");
        store.save("c1", &state).await.unwrap();

        state.push_user("hola");
        store.save("c1", &state).await.unwrap();

        let restored = store.load("c1").await.unwrap().unwrap();
        assert_eq!(restored.messages.len(), 1);
    }
}
