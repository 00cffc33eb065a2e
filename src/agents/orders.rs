//! 订单/发票 Handler
//!
//! 需要订单号实体；缺失时向用户追问，存在时返回演示用的订单状态。
//! 真实实现会查询订单服务与开票服务（外部协作方边界）。

use async_trait::async_trait;

use crate::agents::{Handler, HandlerReply, TurnRequest};
use crate::conversation::ConversationState;

/// 订单状态 / 发票 / 支付问题 Handler
#[derive(Debug, Default)]
pub struct OrderStatusHandler;

impl OrderStatusHandler {
    pub fn new() -> Self {
        Self
    }

    /// 演示用状态：由订单号末位确定，保证同一订单号回答稳定
    fn status_for(order_number: &str) -> &'static str {
        match order_number.chars().last().and_then(|c| c.to_digit(10)) {
            Some(0..=3) => "en preparación",
            Some(4..=6) => "en camino",
            _ => "entregado",
        }
    }
}

#[async_trait]
impl Handler for OrderStatusHandler {
    fn name(&self) -> &str {
        "order_agent"
    }

    fn capabilities(&self) -> &[&str] {
        &["order_status", "invoice_request", "payment_issue"]
    }

    async fn handle(
        &self,
        turn: &TurnRequest,
        _state: &ConversationState,
    ) -> Result<HandlerReply, String> {
        let Some(order_number) = turn.entities.get("order_number") else {
            return Ok(HandlerReply::text(
                "Para ayudarte necesito tu número de pedido (por ejemplo #123456). ¿Me lo pasás?",
            ));
        };

        let reply = match turn.intent.as_str() {
            "invoice_request" => HandlerReply::text(format!(
                "Listo, te envío la factura del pedido #{} a tu correo registrado.",
                order_number
            ))
            .with_tool("invoice_service")
            .complete(),
            "payment_issue" => HandlerReply::text(format!(
                "Veo tu pago del pedido #{}. Si fue rechazado, se libera en 48 hs hábiles; \
                 si persiste avisame y lo revisamos.",
                order_number
            ))
            .with_tool("payment_lookup"),
            _ => {
                let status = Self::status_for(order_number);
                HandlerReply::text(format!(
                    "Tu pedido #{} está {}. Te avisamos por acá ante cualquier novedad.",
                    order_number, status
                ))
                .with_data(serde_json::json!({
                    "order_number": order_number,
                    "status": status,
                }))
                .with_tool("order_lookup")
                .complete()
            }
        };

        Ok(reply)
    }
}
