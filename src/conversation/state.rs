//! 会话聚合根
//!
//! 每个 conversation_id 对应一个 ConversationState，由编排引擎每轮提交一次变更。
//! 不变量：messages.len() >= handler_outputs.len()；error_count 只增不减；
//! requires_human 一旦置位不自动清除；handler_history 允许重复（计入切换上限）。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, Role};

/// 意图识别结果来源（规则 / 外部语义分类器），用于平手裁决与审计日志
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Rule,
    External,
}

/// 意图识别结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// 意图名（如 product_inquiry / appointment_booking / unknown）
    pub name: String,
    /// 置信度，[0, 1]
    pub confidence: f32,
    /// 规则提取的实体（订单号、价格区间、品牌、日期等），扁平 key -> value
    pub entities: HashMap<String, String>,
    /// 建议的 Handler 名
    pub suggested_handler: String,
    /// 是否需要转人工（低置信度或命中强制升级关键词）
    pub requires_handoff: bool,
    pub source: IntentSource,
}

impl IntentResult {
    /// 无法识别时的兜底意图（置信度 0，交给默认 Handler）
    pub fn unknown() -> Self {
        Self {
            name: "unknown".to_string(),
            confidence: 0.0,
            entities: HashMap::new(),
            suggested_handler: "fallback".to_string(),
            requires_handoff: false,
            source: IntentSource::Rule,
        }
    }
}

/// 一次 Handler 调用的结构化结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutput {
    pub handler: String,
    pub text: String,
    /// Handler 检索到的结构化数据（商品列表、订单详情等）
    pub data: Option<serde_json::Value>,
    pub tools_used: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// 会话状态聚合根，可整体序列化为检查点
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// 外部稳定键（如电话号码 + 会话）
    pub conversation_id: String,
    /// 消息历史，只追加
    pub messages: Vec<ChatMessage>,
    /// 最近一次识别的意图
    pub current_intent: Option<IntentResult>,
    /// 历史意图（current_intent 被覆盖时追加）
    pub intent_history: Vec<IntentResult>,
    /// 当前持有回合的 Handler
    pub current_handler: Option<String>,
    /// 被调用过的 Handler 名序列（允许重复，顺序即切换次数依据）
    pub handler_history: Vec<String>,
    /// Handler 调用结果序列
    pub handler_outputs: Vec<HandlerOutput>,
    /// 累计错误数，只增不减
    pub error_count: u32,
    /// 转人工标记，置位后不自动清除
    pub requires_human: bool,
    /// 会话完成标记，新消息到达时由引擎重置
    pub is_complete: bool,
    /// 检查点关联 Token
    pub checkpoint_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// 首条消息到达时创建：空历史、error_count = 0、is_complete = false
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            current_intent: None,
            intent_history: Vec::new(),
            current_handler: None,
            handler_history: Vec::new(),
            handler_outputs: Vec::new(),
            error_count: 0,
            requires_human: false,
            is_complete: false,
            checkpoint_id: format!("ckpt_{}", uuid::Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
        self.touch();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
        self.touch();
    }

    /// 最近一条 assistant 消息的内容（回合结束时作为响应文本返回）
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// 覆盖当前意图；旧值追加到 intent_history
    pub fn set_intent(&mut self, intent: IntentResult) {
        if let Some(prev) = self.current_intent.take() {
            self.intent_history.push(prev);
        }
        self.current_intent = Some(intent);
        self.touch();
    }

    /// 记录一次 Handler 选择（不去重，重复计入切换上限）
    pub fn record_handler(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.handler_history.push(name.clone());
        self.current_handler = Some(name);
        self.touch();
    }

    /// 追加 Handler 调用结果；调用方保证同回合已先追加了用户消息
    pub fn record_output(&mut self, output: HandlerOutput) {
        debug_assert!(self.messages.len() > self.handler_outputs.len());
        self.handler_outputs.push(output);
        self.touch();
    }

    /// 错误计数 +1（永不递减）
    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = ConversationState::new("549111234567");
        assert!(state.messages.is_empty());
        assert!(state.handler_history.is_empty());
        assert_eq!(state.error_count, 0);
        assert!(!state.requires_human);
        assert!(!state.is_complete);
        assert!(state.checkpoint_id.starts_with("ckpt_"));
    }

    #[test]
    fn test_set_intent_appends_previous_to_history() {
        let mut state = ConversationState::new("c1");
        let mut first = IntentResult::unknown();
        first.name = "greeting".to_string();
        state.set_intent(first);
        assert!(state.intent_history.is_empty());

        let mut second = IntentResult::unknown();
        second.name = "product_inquiry".to_string();
        state.set_intent(second);

        assert_eq!(state.intent_history.len(), 1);
        assert_eq!(state.intent_history[0].name, "greeting");
        assert_eq!(state.current_intent.as_ref().unwrap().name, "product_inquiry");
    }

    #[test]
    fn test_record_handler_keeps_duplicates() {
        let mut state = ConversationState::new("c1");
        state.record_handler("product_agent");
        state.record_handler("product_agent");
        assert_eq!(state.handler_history, vec!["product_agent", "product_agent"]);
        assert_eq!(state.current_handler.as_deref(), Some("product_agent"));
    }

    #[test]
    fn test_outputs_never_exceed_messages() {
        let mut state = ConversationState::new("c1");
        state.push_user("hola");
        state.record_output(HandlerOutput {
            handler: "fallback".to_string(),
            text: "hola!".to_string(),
            data: None,
            tools_used: vec![],
            success: true,
            error: None,
            latency_ms: 3,
        });
        state.push_assistant("hola!");
        assert!(state.messages.len() >= state.handler_outputs.len());
    }

    #[test]
    fn test_serde_round_trip_is_lossless() {
        let mut state = ConversationState::new("549111234567");
        state.push_user("busco laptops hp");
        let mut intent = IntentResult::unknown();
        intent.name = "product_inquiry".to_string();
        intent.confidence = 0.85;
        intent.suggested_handler = "product_agent".to_string();
        intent.entities.insert("brand".to_string(), "hp".to_string());
        state.set_intent(intent);
        state.record_handler("product_agent");
        state.record_output(HandlerOutput {
            handler: "product_agent".to_string(),
            text: "Tenemos 2 laptops HP".to_string(),
            data: Some(serde_json::json!({ "count": 2 })),
            tools_used: vec!["catalog_search".to_string()],
            success: true,
            error: None,
            latency_ms: 12,
        });
        state.push_assistant("Tenemos 2 laptops HP");
        state.record_error();

        let blob = serde_json::to_string(&state).unwrap();
        let restored: ConversationState = serde_json::from_str(&blob).unwrap();
        assert_eq!(state, restored);
    }
}
