//! 确定性意图规则
//!
//! 每条规则对应一个意图：关键词（小写子串）与正则各算一次命中，
//! 命中数映射为归一化得分（1 次 0.60、2 次 0.85、3 次及以上 0.95）。
//! 规则按注册顺序求值，平手时先注册者获胜。

use regex::Regex;

/// 单条意图规则
pub struct IntentRule {
    /// 意图名
    pub intent: String,
    /// 建议的 Handler 名
    pub suggested_handler: String,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl IntentRule {
    /// patterns 为静态正则字面量，编译失败属于编程错误
    pub fn new(intent: &str, handler: &str, keywords: &[&str], patterns: &[&str]) -> Self {
        Self {
            intent: intent.to_string(),
            suggested_handler: handler.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("invalid intent rule pattern"))
                .collect(),
        }
    }

    /// 对小写文本求归一化得分；0 命中返回 0.0
    pub fn score(&self, text_lower: &str) -> f32 {
        let mut hits = 0usize;
        for kw in &self.keywords {
            if text_lower.contains(kw.as_str()) {
                hits += 1;
            }
        }
        for pat in &self.patterns {
            if pat.is_match(text_lower) {
                hits += 1;
            }
        }
        match hits {
            0 => 0.0,
            1 => 0.60,
            2 => 0.85,
            _ => 0.95,
        }
    }
}

/// 电商 + 医疗预约领域的默认规则表
pub fn default_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            "greeting",
            "fallback",
            &["hola", "buen día", "buenos días", "buenas tardes", "buenas noches", "hello"],
            &[],
        ),
        IntentRule::new(
            "farewell",
            "fallback",
            &["gracias", "chau", "adiós", "hasta luego", "eso es todo", "nada más"],
            &[],
        ),
        IntentRule::new(
            "product_inquiry",
            "product_agent",
            &[
                "laptop", "notebook", "celular", "televisor", "producto", "precio",
                "show me", "busco", "quiero comprar", "tienen", "modelos", "stock",
            ],
            &[],
        ),
        IntentRule::new(
            "promotion_inquiry",
            "product_agent",
            &["promoción", "promociones", "oferta", "ofertas", "descuento", "cupón"],
            &[],
        ),
        IntentRule::new(
            "order_status",
            "order_agent",
            &[
                "pedido", "orden", "mi compra", "envío", "seguimiento", "tracking",
                "dónde está", "cuándo llega",
            ],
            &[r"#\d{4,}", r"\b\d{6,}\b"],
        ),
        IntentRule::new(
            "invoice_request",
            "order_agent",
            &["factura", "boleta", "comprobante", "invoice"],
            &[],
        ),
        IntentRule::new(
            "payment_issue",
            "order_agent",
            &["pago", "pagar", "mercadopago", "cuotas", "tarjeta", "rechazado"],
            &[],
        ),
        IntentRule::new(
            "appointment_booking",
            "appointment_agent",
            &[
                "turno", "cita", "agendar", "reservar", "consulta", "médico",
                "doctor", "dermatólogo", "appointment",
            ],
            &[],
        ),
        IntentRule::new(
            "appointment_cancel",
            "appointment_agent",
            &["cancelar el turno", "cancelar mi turno", "cancelar la cita", "reprogramar"],
            &[],
        ),
        IntentRule::new(
            "human_handoff",
            "fallback",
            &[
                "hablar con una persona", "hablar con un humano", "agente humano",
                "representante", "operador",
            ],
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_scales_with_hits() {
        let rule = IntentRule::new("product_inquiry", "product_agent", &["laptop", "show me"], &[]);
        assert_eq!(rule.score("hola"), 0.0);
        assert_eq!(rule.score("una laptop"), 0.60);
        assert_eq!(rule.score("show me laptops"), 0.85);
    }

    #[test]
    fn test_pattern_counts_as_hit() {
        let rule = IntentRule::new("order_status", "order_agent", &["pedido"], &[r"#\d{4,}"]);
        assert_eq!(rule.score("mi pedido #12345"), 0.85);
    }

    #[test]
    fn test_default_rules_cover_both_domains() {
        let rules = default_rules();
        let intents: Vec<_> = rules.iter().map(|r| r.intent.as_str()).collect();
        assert!(intents.contains(&"product_inquiry"));
        assert!(intents.contains(&"order_status"));
        assert!(intents.contains(&"appointment_booking"));
        assert!(intents.contains(&"human_handoff"));
    }
}
