//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（非流式，system + 会话消息）。

use async_trait::async_trait;

use crate::conversation::ChatMessage;

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 以 system 提示与会话消息调用模型，返回完整回复文本
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, String>;
}
