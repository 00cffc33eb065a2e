//! Orquesta - WhatsApp 对话助手编排引擎
//!
//! 模块划分：
//! - **agents**: Handler 接口、注册表与内置业务 Handler（产品 / 订单 / 预约 / 兜底）
//! - **classifier**: 意图分类（关键词规则 + LLM 外部语义兜底）与实体抽取
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **conversation**: 会话状态、消息与意图结果类型
//! - **core**: 引擎错误分类
//! - **engine**: 编排引擎（processTurn 主控事务）
//! - **integrations**: 渠道集成（WhatsApp Cloud API）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **router**: 路由/监管状态机（升级策略）
//! - **runtime**: 无头运行时装配（供 REPL / WhatsApp 前端调用）
//! - **store**: 会话检查点存储（内存 / SQLite）

pub mod agents;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod core;
pub mod engine;
pub mod integrations;
pub mod llm;
pub mod observability;
pub mod router;
pub mod runtime;
pub mod store;
