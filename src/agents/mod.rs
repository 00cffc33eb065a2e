//! Agent（Handler）层
//!
//! 所有 Handler 实现统一的 Handler trait（name / capabilities / handle），
//! 由 AgentRegistry 按能力标签注册与解析；内容逻辑（检索排序、SOAP 调用等）
//! 属于各 Handler 自己的边界，引擎只看统一契约。

pub mod appointment;
pub mod fallback;
pub mod orders;
pub mod product;
pub mod registry;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::conversation::ConversationState;

pub use appointment::AppointmentHandler;
pub use fallback::FallbackHandler;
pub use orders::OrderStatusHandler;
pub use product::ProductInquiryHandler;
pub use registry::AgentRegistry;

/// 一个回合交给 Handler 的输入
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub user_message: String,
    /// 分类器提取的实体
    pub entities: HashMap<String, String>,
    /// 已识别的意图名
    pub intent: String,
}

/// Handler 成功时的结构化回复
#[derive(Clone, Debug)]
pub struct HandlerReply {
    pub text: String,
    /// 检索到的结构化数据（商品、订单等）
    pub data: Option<serde_json::Value>,
    pub tools_used: Vec<String>,
    /// Handler 认为会话可以收尾时置位
    pub is_complete: bool,
}

impl HandlerReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            data: None,
            tools_used: Vec::new(),
            is_complete: false,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_used.push(tool.into());
        self
    }

    pub fn complete(mut self) -> Self {
        self.is_complete = true;
        self
    }
}

/// Handler trait：名称、能力标签（意图名）、异步处理
///
/// Handler 内部调用外部服务时不得让错误向上穿透为 panic；
/// 返回 Err 由引擎按 Handler 失败统一处理（error_count +1，通用道歉）。
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handler 名（handler_history 中记录的值）
    fn name(&self) -> &str;

    /// 能处理的意图名列表
    fn capabilities(&self) -> &[&str];

    /// 处理一个回合
    async fn handle(
        &self,
        turn: &TurnRequest,
        state: &ConversationState,
    ) -> Result<HandlerReply, String>;
}
