//! 外部语义分类兜底
//!
//! 规则得分不够时调用；接口只约定 (intent, confidence)，实现自带超时之外的
//! 一切细节。LlmExternalClassifier 用 LLM 按固定 JSON 格式回答意图。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::conversation::ChatMessage;
use crate::llm::LlmClient;

/// 外部分类器返回值
#[derive(Clone, Debug)]
pub struct ExternalIntent {
    pub intent: String,
    pub confidence: f32,
}

/// 外部语义分类器接口；必须在调用方的超时内返回，否则按不可用处理
#[async_trait]
pub trait ExternalClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        recent: &[ChatMessage],
    ) -> Result<ExternalIntent, String>;
}

/// LLM 实现：prompt 列出全部意图名，要求只输出一行 JSON
pub struct LlmExternalClassifier {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

#[derive(Deserialize)]
struct LlmIntentReply {
    intent: String,
    confidence: f32,
}

impl LlmExternalClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, intent_names: &[String]) -> Self {
        let system_prompt = format!(
            "You are an intent classifier for a WhatsApp shopping and medical appointment \
             assistant. Classify the user's last message into exactly one of these intents:\n{}\n\
             unknown\n\n\
             Output ONLY one line of JSON, nothing else:\n\
             {{\"intent\": \"<intent>\", \"confidence\": <0.0-1.0>}}",
            intent_names.join("\n"),
        );
        Self { llm, system_prompt }
    }
}

#[async_trait]
impl ExternalClassifier for LlmExternalClassifier {
    async fn classify(
        &self,
        text: &str,
        recent: &[ChatMessage],
    ) -> Result<ExternalIntent, String> {
        // 最近几条消息作为上下文，当前文本作为待分类消息
        let mut messages: Vec<ChatMessage> = recent
            .iter()
            .rev()
            .take(6)
            .rev()
            .cloned()
            .collect();
        messages.push(ChatMessage::user(text));

        let raw = self.llm.complete(&self.system_prompt, &messages).await?;
        let reply: LlmIntentReply = serde_json::from_str(raw.trim())
            .map_err(|e| format!("unparseable classifier reply '{}': {}", raw.trim(), e))?;

        Ok(ExternalIntent {
            intent: reply.intent,
            confidence: reply.confidence.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_parses_json_reply() {
        let llm = Arc::new(MockLlmClient::new(
            r#"{"intent": "product_inquiry", "confidence": 0.8}"#,
        ));
        let classifier = LlmExternalClassifier::new(llm, &["product_inquiry".to_string()]);
        let result = classifier.classify("busco algo", &[]).await.unwrap();
        assert_eq!(result.intent, "product_inquiry");
        assert!((result.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_garbage_reply_is_error() {
        let llm = Arc::new(MockLlmClient::new("I think it is about products"));
        let classifier = LlmExternalClassifier::new(llm, &[]);
        assert!(classifier.classify("busco algo", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_confidence_is_clamped() {
        let llm = Arc::new(MockLlmClient::new(
            r#"{"intent": "unknown", "confidence": 3.5}"#,
        ));
        let classifier = LlmExternalClassifier::new(llm, &[]);
        let result = classifier.classify("x", &[]).await.unwrap();
        assert_eq!(result.confidence, 1.0);
    }
}
