//! 无头运行时装配
//!
//! 供各前端（控制台 REPL / WhatsApp）调用的组装逻辑：从配置构建 LLM 客户端、
//! 分类器、Handler 注册表与状态存储，最后拼成 OrchestrationEngine。
//! 前端只需要 `create_engine(cfg)` 与 `engine.process_turn(...)`。

use std::sync::Arc;
use std::time::Duration;

use crate::agents::{
    AgentRegistry, AppointmentHandler, FallbackHandler, OrderStatusHandler, ProductInquiryHandler,
};
use crate::classifier::external::LlmExternalClassifier;
use crate::classifier::rules::default_rules;
use crate::classifier::IntentClassifier;
use crate::config::AppConfig;
use crate::core::EngineError;
use crate::engine::OrchestrationEngine;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::router::{Router, RoutingPolicy};
use crate::store::create_state_store;

/// 从配置创建 LLM 客户端：有 OPENAI_API_KEY 且 provider 不是 mock 则走 OpenAI 兼容端点，否则 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "mock";

    if use_openai {
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider is mock, using Mock LLM");
        Arc::new(MockLlmClient::default())
    }
}

/// 创建默认 Handler 注册表：产品 / 订单 / 预约 + 默认兜底
pub fn create_default_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry.register_default(FallbackHandler::new());
    registry.register(ProductInquiryHandler::new());
    registry.register(OrderStatusHandler::new());
    registry.register(AppointmentHandler::new());
    registry
}

/// 从配置装配完整引擎：分类器（规则 + LLM 外部兜底）、注册表、状态存储、路由策略
pub async fn create_engine(cfg: &AppConfig) -> Result<OrchestrationEngine, EngineError> {
    let registry = Arc::new(create_default_registry());

    let mut classifier = IntentClassifier::new(default_rules(), &cfg.classifier);
    let intent_names = classifier.intent_names();
    let llm = create_llm_from_config(cfg);
    classifier = classifier.with_external(Arc::new(LlmExternalClassifier::new(llm, &intent_names)));

    let router = Router::new(classifier, registry.clone(), RoutingPolicy::from(&cfg.orchestrator));

    let store = create_state_store(cfg.store.db_path.as_deref()).await;

    OrchestrationEngine::new(
        router,
        registry,
        store,
        Duration::from_secs(cfg.orchestrator.handler_timeout_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_validates() {
        let registry = create_default_registry();
        assert!(registry.validate().is_ok());
        assert!(registry.handler_names().contains(&"product_agent".to_string()));
    }

    #[tokio::test]
    async fn test_engine_assembles_from_default_config() {
        let cfg = AppConfig::default();
        let engine = create_engine(&cfg).await.unwrap();
        let reply = engine.process_turn("c1", "hola").await.unwrap();
        assert!(!reply.response_text.is_empty());
    }
}
