//! 路由/监管：ConversationState 上的状态机
//!
//! 每回合按严格顺序求值：已转人工 > 已完成 > 错误预算 > 切换上限 > 分类转人工 > 正常路由。
//! 升级（EscalationCondition）是显式的终态路由决策，不是错误；
//! 真正的路由异常只做 error_count +1 并强制默认兜底，升级留给下一回合的阈值检查。

use std::sync::Arc;

use serde::Serialize;

use crate::agents::AgentRegistry;
use crate::classifier::IntentClassifier;
use crate::config::OrchestratorSection;
use crate::conversation::ConversationState;

/// 路由状态机的状态（HandlerActive 仅在引擎调用 Handler 期间短暂存在）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RouterState {
    Routing,
    HandlerActive,
    AwaitingNextTurn,
    Escalated,
    Completed,
}

impl RouterState {
    /// 由会话标志推导当前状态（用于日志与测试）
    pub fn of(state: &ConversationState) -> Self {
        if state.requires_human {
            RouterState::Escalated
        } else if state.is_complete {
            RouterState::Completed
        } else if state.current_handler.is_some() {
            RouterState::AwaitingNextTurn
        } else {
            RouterState::Routing
        }
    }
}

/// 升级原因（审计日志与测试断言用）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// requires_human 已置位，不再分类与路由
    AlreadyEscalated,
    /// error_count 达到 max_errors
    ErrorBudgetExhausted,
    /// handler_history 达到 max_handler_switches
    SwitchCapExceeded,
    /// 分类结果要求转人工（低置信度或强制升级关键词）
    HandoffRequested,
}

/// 一次路由的结果
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingDecision {
    /// 转人工：引擎跳过 Handler，回复固定话术
    Escalate(EscalationReason),
    /// 会话已完成且未被重置：保持 Completed（引擎在新消息到达时先重置）
    StayCompleted,
    /// 调用指定 Handler
    Invoke { handler: String },
}

/// 升级策略阈值
#[derive(Clone, Copy, Debug)]
pub struct RoutingPolicy {
    pub max_errors: u32,
    pub max_handler_switches: usize,
}

impl From<&OrchestratorSection> for RoutingPolicy {
    fn from(cfg: &OrchestratorSection) -> Self {
        Self {
            max_errors: cfg.max_errors,
            max_handler_switches: cfg.max_handler_switches,
        }
    }
}

/// 路由器：分类器 + 注册表 + 策略；启动后只读
pub struct Router {
    classifier: IntentClassifier,
    registry: Arc<AgentRegistry>,
    policy: RoutingPolicy,
}

impl Router {
    pub fn new(
        classifier: IntentClassifier,
        registry: Arc<AgentRegistry>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            classifier,
            registry,
            policy,
        }
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// 对一条新消息做路由决策，并把意图/Handler 变更写入会话状态
    pub async fn route(&self, state: &mut ConversationState, text: &str) -> RoutingDecision {
        // 1. 已转人工：保持 Escalated，不分类、不路由
        if state.requires_human {
            return RoutingDecision::Escalate(EscalationReason::AlreadyEscalated);
        }

        // 2. 已完成且未被重置：保持 Completed
        if state.is_complete {
            return RoutingDecision::StayCompleted;
        }

        // 3. 错误预算耗尽
        if state.error_count >= self.policy.max_errors {
            state.requires_human = true;
            return RoutingDecision::Escalate(EscalationReason::ErrorBudgetExhausted);
        }

        // 4. Handler 切换上限（重复计入）
        if state.handler_history.len() >= self.policy.max_handler_switches {
            state.requires_human = true;
            return RoutingDecision::Escalate(EscalationReason::SwitchCapExceeded);
        }

        // 5. 分类；requires_handoff 短路正常路由（与置信度高低无关）
        let intent = self.classifier.classify(text, &state.messages).await;
        let requires_handoff = intent.requires_handoff;
        let suggested = intent.suggested_handler.clone();
        let intent_name = intent.name.clone();
        state.set_intent(intent);

        if requires_handoff {
            state.requires_human = true;
            return RoutingDecision::Escalate(EscalationReason::HandoffRequested);
        }

        // 6. 解析 Handler：建议名已注册则用之，否则默认兜底
        let handler = if self.registry.get(&suggested).is_some() {
            suggested
        } else {
            match self.registry.resolve(&intent_name) {
                Some(name) => name,
                None => {
                    // 路由异常：error_count +1，不把无法调用的名字写进 handler_history；
                    // 升级只通过上面的阈值检查发生。validate() 之后到不了这里。
                    state.record_error();
                    tracing::error!(
                        "No handler resolvable for intent '{}' and no default configured",
                        intent_name
                    );
                    return RoutingDecision::Invoke { handler: suggested };
                }
            }
        };

        state.record_handler(&handler);
        RoutingDecision::Invoke { handler }
    }
}
