//! 实体提取
//!
//! 基于规则、按意图定制：订单号、价格区间、品牌、容量、预约日期/时间/专科。
//! 返回扁平 key -> value 映射；正则在构造时编译一次，此后只读共享。

use std::collections::HashMap;

use regex::Regex;

/// 实体提取器（正则预编译，跨会话共享）
pub struct EntityExtractor {
    order_number: Regex,
    price_max: Regex,
    price_min: Regex,
    brand: Regex,
    storage: Regex,
    date: Regex,
    time: Regex,
    specialty: Regex,
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self {
            order_number: Regex::new(r"#?(\d{5,})").expect("invalid entity pattern"),
            price_max: Regex::new(r"(?:menos de|hasta|máximo|debajo de|under|below)\s*\$?\s*(\d+)")
                .expect("invalid entity pattern"),
            price_min: Regex::new(r"(?:más de|desde|mínimo|arriba de|over|above)\s*\$?\s*(\d+)")
                .expect("invalid entity pattern"),
            brand: Regex::new(
                r"\b(hp|dell|lenovo|asus|acer|samsung|apple|motorola|xiaomi|lg|sony)\b",
            )
            .expect("invalid entity pattern"),
            storage: Regex::new(r"(\d+)\s*(gb|tb)\b").expect("invalid entity pattern"),
            date: Regex::new(r"\b(\d{1,2}[/-]\d{1,2}(?:[/-]\d{2,4})?)\b")
                .expect("invalid entity pattern"),
            time: Regex::new(r"\b(\d{1,2}:\d{2})\b").expect("invalid entity pattern"),
            specialty: Regex::new(
                r"\b(dermatología|cardiología|pediatría|odontología|traumatología|clínica)\b",
            )
            .expect("invalid entity pattern"),
        }
    }

    /// 按意图提取实体；未知意图返回空映射
    pub fn extract(&self, intent: &str, text: &str) -> HashMap<String, String> {
        let lower = text.to_lowercase();
        let mut out = HashMap::new();

        match intent {
            "product_inquiry" | "promotion_inquiry" => {
                capture_into(&self.brand, &lower, "brand", &mut out);
                capture_into(&self.price_max, &lower, "price_max", &mut out);
                capture_into(&self.price_min, &lower, "price_min", &mut out);
                if let Some(c) = self.storage.captures(&lower) {
                    out.insert("storage".to_string(), format!("{}{}", &c[1], &c[2]));
                }
            }
            "order_status" | "invoice_request" | "payment_issue" => {
                capture_into(&self.order_number, &lower, "order_number", &mut out);
            }
            "appointment_booking" | "appointment_cancel" => {
                capture_into(&self.date, &lower, "date", &mut out);
                capture_into(&self.time, &lower, "time", &mut out);
                capture_into(&self.specialty, &lower, "specialty", &mut out);
            }
            _ => {}
        }

        out
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn capture_into(re: &Regex, text: &str, key: &str, out: &mut HashMap<String, String>) {
    if let Some(c) = re.captures(text) {
        out.insert(key.to_string(), c[1].to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_entities() {
        let ex = EntityExtractor::new();
        let entities = ex.extract("product_inquiry", "busco una laptop HP de 512 GB menos de $800");
        assert_eq!(entities.get("brand").map(String::as_str), Some("hp"));
        assert_eq!(entities.get("price_max").map(String::as_str), Some("800"));
        assert_eq!(entities.get("storage").map(String::as_str), Some("512gb"));
    }

    #[test]
    fn test_order_number() {
        let ex = EntityExtractor::new();
        let entities = ex.extract("order_status", "dónde está mi pedido #123456?");
        assert_eq!(entities.get("order_number").map(String::as_str), Some("123456"));
    }

    #[test]
    fn test_appointment_entities() {
        let ex = EntityExtractor::new();
        let entities =
            ex.extract("appointment_booking", "turno de dermatología el 12/09 a las 14:30");
        assert_eq!(entities.get("date").map(String::as_str), Some("12/09"));
        assert_eq!(entities.get("time").map(String::as_str), Some("14:30"));
        assert_eq!(entities.get("specialty").map(String::as_str), Some("dermatología"));
    }

    #[test]
    fn test_unknown_intent_yields_nothing() {
        let ex = EntityExtractor::new();
        assert!(ex.extract("greeting", "hola, pedido #123456").is_empty());
    }
}
