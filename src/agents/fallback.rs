//! 默认兜底 Handler
//!
//! 承接问候、告别与无法识别的消息；告别时向引擎发出 is_complete 信号。

use async_trait::async_trait;

use crate::agents::{Handler, HandlerReply, TurnRequest};
use crate::conversation::ConversationState;

/// 兜底 Handler：问候 / 告别 / "没听懂"
#[derive(Debug, Default)]
pub struct FallbackHandler;

impl FallbackHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for FallbackHandler {
    fn name(&self) -> &str {
        "fallback"
    }

    fn capabilities(&self) -> &[&str] {
        &["greeting", "farewell", "unknown"]
    }

    async fn handle(
        &self,
        turn: &TurnRequest,
        _state: &ConversationState,
    ) -> Result<HandlerReply, String> {
        let reply = match turn.intent.as_str() {
            "greeting" => HandlerReply::text(
                "¡Hola! Puedo ayudarte con productos, pedidos, facturas y turnos médicos. \
                 ¿Qué necesitás?",
            ),
            "farewell" => HandlerReply::text("¡Gracias por escribirnos! Que tengas un buen día.")
                .complete(),
            _ => HandlerReply::text(
                "Perdón, no entendí tu consulta. Puedo ayudarte con productos, \
                 pedidos, facturas o turnos médicos.",
            ),
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn turn(intent: &str) -> TurnRequest {
        TurnRequest {
            user_message: "x".to_string(),
            entities: HashMap::new(),
            intent: intent.to_string(),
        }
    }

    #[tokio::test]
    async fn test_farewell_completes_conversation() {
        let handler = FallbackHandler::new();
        let state = ConversationState::new("c1");
        let reply = handler.handle(&turn("farewell"), &state).await.unwrap();
        assert!(reply.is_complete);
    }

    #[tokio::test]
    async fn test_unknown_does_not_complete() {
        let handler = FallbackHandler::new();
        let state = ConversationState::new("c1");
        let reply = handler.handle(&turn("unknown"), &state).await.unwrap();
        assert!(!reply.is_complete);
        assert!(reply.text.contains("no entendí"));
    }
}
