//! 会话状态模型
//!
//! ConversationState 是每个会话唯一的可变聚合根：消息历史、意图历史、
//! Handler 调用记录与错误计数。引擎每轮恰好提交一次变更，聚合本身可序列化为检查点。

pub mod message;
pub mod state;

pub use message::{ChatMessage, Role};
pub use state::{ConversationState, HandlerOutput, IntentResult, IntentSource};
