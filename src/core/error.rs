//! 引擎错误分类
//!
//! 组件级失败在引擎内被捕获并转为状态变更（error_count++）或显式终态标记；
//! Routing（缺默认兜底）在引擎构造时传出，Persistence（本回合不提交）从 process_turn 传出。

use thiserror::Error;

use crate::store::StoreError;

/// 编排引擎错误
#[derive(Error, Debug)]
pub enum EngineError {
    /// 外部分类器不可用/超时；就地降级为规则结果，不向用户暴露
    #[error("Classification failed: {0}")]
    Classification(String),

    /// 无法解析 Handler 且没有默认兜底：启动期致命配置错误
    #[error("Routing misconfiguration: {0}")]
    Routing(String),

    /// Handler 抛错；就地恢复，error_count +1，用户只看到通用道歉
    #[error("Handler '{0}' failed: {1}")]
    HandlerFailed(String, String),

    /// Handler 超时；与失败同等对待
    #[error("Handler '{0}' timed out")]
    HandlerTimeout(String),

    /// 检查点读写失败：本回合视为未提交
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(String),
}
