//! 医疗预约 Handler
//!
//! 日期 + 时间齐备时确认预约并收尾；缺失时逐项追问。
//! 真实实现会走预约系统的 SOAP/HTTP 接口（外部协作方边界）。

use async_trait::async_trait;

use crate::agents::{Handler, HandlerReply, TurnRequest};
use crate::conversation::ConversationState;

/// 预约/改期 Handler
#[derive(Debug, Default)]
pub struct AppointmentHandler;

impl AppointmentHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for AppointmentHandler {
    fn name(&self) -> &str {
        "appointment_agent"
    }

    fn capabilities(&self) -> &[&str] {
        &["appointment_booking", "appointment_cancel"]
    }

    async fn handle(
        &self,
        turn: &TurnRequest,
        _state: &ConversationState,
    ) -> Result<HandlerReply, String> {
        if turn.intent == "appointment_cancel" {
            return Ok(HandlerReply::text(
                "Entendido, cancelamos tu turno. Si querés reprogramar, decime día y horario.",
            )
            .with_tool("agenda")
            .complete());
        }

        let date = turn.entities.get("date");
        let time = turn.entities.get("time");
        let specialty = turn
            .entities
            .get("specialty")
            .map(String::as_str)
            .unwrap_or("clínica");

        let reply = match (date, time) {
            (Some(date), Some(time)) => HandlerReply::text(format!(
                "¡Listo! Turno de {} reservado para el {} a las {}. Te llega la confirmación por acá.",
                specialty, date, time
            ))
            .with_data(serde_json::json!({
                "specialty": specialty,
                "date": date,
                "time": time,
            }))
            .with_tool("agenda")
            .complete(),
            (Some(_), None) => {
                HandlerReply::text("¿A qué horario te queda cómodo? (por ejemplo 14:30)")
            }
            _ => HandlerReply::text(
                "¿Para qué día querés el turno? Decime fecha (12/09) y horario (14:30).",
            ),
        };

        Ok(reply)
    }
}
