//! 编排引擎：每条入站消息的主控事务
//!
//! processTurn 每次调用恰好推进一个回合：取会话锁 -> 加载（或新建）状态 ->
//! 追加用户消息 -> 路由 -> 调用 Handler（限时）-> 合并结果 -> 持久化 -> 返回。
//! 组件失败都在这里转为状态变更或固定话术；只有持久化失败会让本回合不提交。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::agents::{AgentRegistry, TurnRequest};
use crate::conversation::{ConversationState, HandlerOutput, IntentResult};
use crate::core::EngineError;
use crate::router::{Router, RoutingDecision};
use crate::store::StateStore;

/// 转人工固定话术（不暴露任何技术细节）
pub const HUMAN_HANDOFF_REPLY: &str =
    "Te estamos derivando con un agente humano que va a continuar la conversación. \
     ¡Gracias por tu paciencia!";

/// Handler 失败时的通用道歉（不暴露原始错误）
pub const APOLOGY_REPLY: &str =
    "Perdón, tuvimos un inconveniente procesando tu mensaje. \
     ¿Podés intentarlo de nuevo en un momento?";

/// processTurn 的返回：响应文本 + 控制标志
#[derive(Clone, Debug)]
pub struct TurnReply {
    pub response_text: String,
    pub is_complete: bool,
    pub requires_human: bool,
}

/// 编排引擎：组合分类器（经 Router）、注册表与状态存储
///
/// 所有依赖在构造时显式注入；注册表与规则表启动后只读，跨会话共享。
pub struct OrchestrationEngine {
    router: Router,
    registry: Arc<AgentRegistry>,
    store: Arc<dyn StateStore>,
    handler_timeout: Duration,
    /// conversation_id -> 回合锁：同一会话串行，不同会话完全并行
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrchestrationEngine {
    /// 构造引擎；注册表缺少默认兜底属于致命配置错误，在这里快速失败
    pub fn new(
        router: Router,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn StateStore>,
        handler_timeout: Duration,
    ) -> Result<Self, EngineError> {
        registry.validate()?;
        Ok(Self {
            router,
            registry,
            store,
            handler_timeout,
            turn_locks: Mutex::new(HashMap::new()),
        })
    }

    /// 核心唯一公共入口：处理一条入站消息，推进恰好一个回合
    ///
    /// Webhook 解析、鉴权与渠道格式化都在核心之外，translate 到这个调用。
    pub async fn process_turn(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<TurnReply, EngineError> {
        let lock = self.lock_for(conversation_id).await;
        let guard = lock.lock().await;
        let result = self.run_turn(conversation_id, text).await;
        drop(guard);
        self.evict_lock(conversation_id, &lock).await;
        result
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<TurnReply, EngineError> {
        let mut state = self
            .store
            .load(conversation_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(conversation_id));

        state.push_user(text);

        // 新消息重新打开已完成的会话；error_count、requires_human 与历史保持不变
        if state.is_complete {
            state.is_complete = false;
        }

        let decision = self.router.route(&mut state, text).await;

        match decision {
            RoutingDecision::Escalate(reason) => {
                tracing::info!(
                    conversation = conversation_id,
                    reason = ?reason,
                    "Escalating conversation to human"
                );
                state.push_assistant(HUMAN_HANDOFF_REPLY);
            }
            RoutingDecision::StayCompleted => {
                // is_complete 在上面已重置，正常流程到不了这里
                tracing::debug!(conversation = conversation_id, "Conversation already completed");
            }
            RoutingDecision::Invoke { handler } => {
                self.invoke_handler(conversation_id, &handler, text, &mut state)
                    .await;
            }
        }

        // 完整合并后才落盘；任何存储失败意味着本回合不提交
        self.store.save(conversation_id, &state).await?;

        Ok(TurnReply {
            response_text: state.last_assistant_text().unwrap_or_default().to_string(),
            is_complete: state.is_complete,
            requires_human: state.requires_human,
        })
    }

    /// 限时调用 Handler 并把结果合并进状态；失败与超时同等处理
    async fn invoke_handler(
        &self,
        conversation_id: &str,
        handler_name: &str,
        text: &str,
        state: &mut ConversationState,
    ) {
        let Some(handler) = self.registry.get(handler_name) else {
            // 未注册的 Handler 名只可能来自路由异常分支，error_count 已在那里 +1
            state.push_assistant(APOLOGY_REPLY);
            tracing::error!(
                conversation = conversation_id,
                handler = handler_name,
                "Resolved handler is not registered"
            );
            return;
        };

        let intent = state
            .current_intent
            .clone()
            .unwrap_or_else(IntentResult::unknown);
        let turn = TurnRequest {
            user_message: text.to_string(),
            entities: intent.entities,
            intent: intent.name,
        };

        let start = Instant::now();
        let result = timeout(self.handler_timeout, handler.handle(&turn, &*state)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "handler_audit",
            "conversation": conversation_id,
            "handler": handler_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": latency_ms,
        });
        tracing::info!(audit = %audit.to_string(), "handler");

        match result {
            Ok(Ok(reply)) => {
                state.record_output(HandlerOutput {
                    handler: handler_name.to_string(),
                    text: reply.text.clone(),
                    data: reply.data,
                    tools_used: reply.tools_used,
                    success: true,
                    error: None,
                    latency_ms,
                });
                state.push_assistant(reply.text);
                if reply.is_complete {
                    state.is_complete = true;
                }
            }
            Ok(Err(e)) => {
                state.record_error();
                state.record_output(HandlerOutput {
                    handler: handler_name.to_string(),
                    text: String::new(),
                    data: None,
                    tools_used: Vec::new(),
                    success: false,
                    error: Some(e),
                    latency_ms,
                });
                state.push_assistant(APOLOGY_REPLY);
            }
            Err(_) => {
                state.record_error();
                state.record_output(HandlerOutput {
                    handler: handler_name.to_string(),
                    text: String::new(),
                    data: None,
                    tools_used: Vec::new(),
                    success: false,
                    error: Some("handler timed out".to_string()),
                    latency_ms,
                });
                state.push_assistant(APOLOGY_REPLY);
            }
        }
    }

    async fn lock_for(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 回合结束后回收锁条目，避免锁表随会话数无界增长
    ///
    /// 持有表锁期间无人能再 clone：strong_count == 2（表内一份 + 本地一份）
    /// 即没有等待者，可以安全移除；有等待者时由最后一个完成的回合回收。
    async fn evict_lock(&self, conversation_id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        if let Some(entry) = locks.get(conversation_id) {
            if Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2 {
                locks.remove(conversation_id);
            }
        }
    }
}
