//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 返回构造时注入的固定回复；默认回复一个 unknown 意图 JSON，便于本地跑通分类兜底路径。

use async_trait::async_trait;

use crate::conversation::ChatMessage;
use crate::llm::LlmClient;

/// Mock 客户端：固定回复
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    reply: String,
}

impl MockLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new(r#"{"intent": "unknown", "confidence": 0.0}"#)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _system: &str, _messages: &[ChatMessage]) -> Result<String, String> {
        Ok(self.reply.clone())
    }
}
