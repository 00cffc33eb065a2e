//! 商品咨询 Handler
//!
//! 演示用的内置目录检索：按品牌/价格上限过滤一个小型静态目录。
//! 真实部署中检索排序属于外部协作方，这里只保证契约与实体消费完整。

use async_trait::async_trait;
use serde::Serialize;

use crate::agents::{Handler, HandlerReply, TurnRequest};
use crate::conversation::ConversationState;

#[derive(Clone, Debug, Serialize)]
struct Product {
    name: &'static str,
    brand: &'static str,
    price: u32,
}

const CATALOG: &[Product] = &[
    Product { name: "Laptop HP Pavilion 15", brand: "hp", price: 750 },
    Product { name: "Laptop Lenovo IdeaPad 3", brand: "lenovo", price: 620 },
    Product { name: "Laptop Dell Inspiron 14", brand: "dell", price: 880 },
    Product { name: "Celular Samsung Galaxy A54", brand: "samsung", price: 430 },
    Product { name: "Celular Motorola Edge 40", brand: "motorola", price: 510 },
    Product { name: "Televisor LG 55\" 4K", brand: "lg", price: 690 },
];

/// 商品咨询/促销 Handler
#[derive(Debug, Default)]
pub struct ProductInquiryHandler;

impl ProductInquiryHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for ProductInquiryHandler {
    fn name(&self) -> &str {
        "product_agent"
    }

    fn capabilities(&self) -> &[&str] {
        &["product_inquiry", "promotion_inquiry"]
    }

    async fn handle(
        &self,
        turn: &TurnRequest,
        _state: &ConversationState,
    ) -> Result<HandlerReply, String> {
        let brand = turn.entities.get("brand").map(String::as_str);
        let price_max: Option<u32> = turn
            .entities
            .get("price_max")
            .and_then(|p| p.parse().ok());

        let matches: Vec<&Product> = CATALOG
            .iter()
            .filter(|p| brand.map_or(true, |b| p.brand == b))
            .filter(|p| price_max.map_or(true, |max| p.price <= max))
            .collect();

        if matches.is_empty() {
            return Ok(HandlerReply::text(
                "No encontré productos con esos criterios. ¿Querés probar con otra marca o presupuesto?",
            )
            .with_tool("catalog_search"));
        }

        let mut text = String::from("Esto es lo que tenemos:\n");
        for p in &matches {
            text.push_str(&format!("• {} — ${}\n", p.name, p.price));
        }
        text.push_str("¿Te interesa alguno?");

        let data = serde_json::to_value(
            matches.iter().map(|p| (*p).clone()).collect::<Vec<_>>(),
        )
        .map_err(|e| e.to_string())?;

        Ok(HandlerReply::text(text)
            .with_data(data)
            .with_tool("catalog_search"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_filters_by_brand_and_price() {
        let handler = ProductInquiryHandler::new();
        let state = ConversationState::new("c1");
        let mut entities = HashMap::new();
        entities.insert("brand".to_string(), "hp".to_string());
        entities.insert("price_max".to_string(), "800".to_string());

        let reply = handler
            .handle(
                &TurnRequest {
                    user_message: "busco laptop hp hasta 800".to_string(),
                    entities,
                    intent: "product_inquiry".to_string(),
                },
                &state,
            )
            .await
            .unwrap();

        assert!(reply.text.contains("HP Pavilion"));
        assert!(!reply.text.contains("Dell"));
        assert_eq!(reply.tools_used, vec!["catalog_search"]);
        assert!(reply.data.is_some());
    }

    #[tokio::test]
    async fn test_no_match_asks_for_other_criteria() {
        let handler = ProductInquiryHandler::new();
        let state = ConversationState::new("c1");
        let mut entities = HashMap::new();
        entities.insert("price_max".to_string(), "10".to_string());

        let reply = handler
            .handle(
                &TurnRequest {
                    user_message: "algo de menos de 10".to_string(),
                    entities,
                    intent: "product_inquiry".to_string(),
                },
                &state,
            )
            .await
            .unwrap();

        assert!(reply.text.contains("No encontré"));
        assert!(reply.data.is_none());
    }
}
