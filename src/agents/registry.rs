//! Agent 注册表
//!
//! 启动时静态注册全部 Handler，按能力标签建立 意图 -> Handler 映射；
//! 未知意图解析到默认兜底 Handler（不是错误）。没有默认兜底属于致命配置错误，
//! validate() 在启动期快速失败，而不是等到运行时。

use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::Handler;
use crate::core::EngineError;

/// Agent 注册表：启动后只读，可跨会话无锁共享
#[derive(Default)]
pub struct AgentRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    intent_map: HashMap<String, String>,
    default_handler: Option<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Handler，并把其全部能力标签映射到它
    pub fn register(&mut self, handler: impl Handler + 'static) {
        let name = handler.name().to_string();
        for intent in handler.capabilities() {
            self.intent_map.insert((*intent).to_string(), name.clone());
        }
        self.handlers.insert(name, Arc::new(handler));
    }

    /// 注册默认兜底 Handler（未知意图总能回答"没听懂"一类）
    pub fn register_default(&mut self, handler: impl Handler + 'static) {
        let name = handler.name().to_string();
        self.register(handler);
        self.default_handler = Some(name);
    }

    /// 解析意图到 Handler 名；未知意图返回默认兜底
    ///
    /// 调用前必须通过 validate()，否则默认兜底可能缺失。
    pub fn resolve(&self, intent: &str) -> Option<String> {
        self.intent_map
            .get(intent)
            .cloned()
            .or_else(|| self.default_handler.clone())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn default_handler(&self) -> Option<&str> {
        self.default_handler.as_deref()
    }

    /// 启动期校验：默认兜底必须存在且已注册
    pub fn validate(&self) -> Result<(), EngineError> {
        match &self.default_handler {
            Some(name) if self.handlers.contains_key(name) => Ok(()),
            Some(name) => Err(EngineError::Routing(format!(
                "default handler '{}' is not registered",
                name
            ))),
            None => Err(EngineError::Routing(
                "no default fallback handler configured".to_string(),
            )),
        }
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
