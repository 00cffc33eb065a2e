//! 意图分类
//!
//! 先跑确定性规则（关键词/正则，按序求分），得分低于阈值时调用外部语义分类器，
//! 取置信度严格更高者；恰好平手时规则结果获胜（保证确定性与可测试性）。
//! 外部路径的任何失败都就地降级为规则结果（置信度不变），分类永不失败。

pub mod entities;
pub mod external;
pub mod rules;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::ClassifierSection;
use crate::conversation::{ChatMessage, IntentResult, IntentSource};
use entities::EntityExtractor;
use external::ExternalClassifier;
use rules::IntentRule;

/// 意图分类器：规则表 + 可选外部语义兜底
///
/// 规则表在启动后只读，可跨会话无锁共享。
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
    extractor: EntityExtractor,
    external: Option<Arc<dyn ExternalClassifier>>,
    rule_threshold: f32,
    handoff_threshold: f32,
    escalation_keywords: Vec<String>,
    external_timeout: Duration,
}

impl IntentClassifier {
    pub fn new(rules: Vec<IntentRule>, cfg: &ClassifierSection) -> Self {
        Self {
            rules,
            extractor: EntityExtractor::new(),
            external: None,
            rule_threshold: cfg.rule_confidence_threshold,
            handoff_threshold: cfg.handoff_confidence_threshold,
            escalation_keywords: cfg
                .escalation_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            external_timeout: Duration::from_secs(cfg.external_timeout_secs),
        }
    }

    pub fn with_external(mut self, external: Arc<dyn ExternalClassifier>) -> Self {
        self.external = Some(external);
        self
    }

    /// 分类器识别的全部意图名（供外部分类器 prompt 使用）
    pub fn intent_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.intent.clone()).collect()
    }

    /// 识别意图；永不失败，最坏返回 unknown（置信度 0，交默认 Handler）
    pub async fn classify(&self, text: &str, recent: &[ChatMessage]) -> IntentResult {
        let mut result = self.best_rule_match(text);

        if result.confidence < self.rule_threshold {
            if let Some(external) = &self.external {
                match timeout(self.external_timeout, external.classify(text, recent)).await {
                    // 严格更高才采纳外部结果；平手时规则获胜
                    Ok(Ok(ext)) if ext.confidence > result.confidence => {
                        result = IntentResult {
                            name: ext.intent.clone(),
                            confidence: ext.confidence.clamp(0.0, 1.0),
                            entities: self.extractor.extract(&ext.intent, text),
                            suggested_handler: self.handler_for(&ext.intent),
                            requires_handoff: false,
                            source: IntentSource::External,
                        };
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        tracing::warn!("External classifier failed, keeping rule result: {}", e);
                    }
                    Err(_) => {
                        tracing::warn!("External classifier timed out, keeping rule result");
                    }
                }
            }
        }

        result.requires_handoff = self.needs_handoff(text, &result);
        result
    }

    /// 按序遍历规则，取得分严格更高者（先注册的规则在平手时获胜）
    fn best_rule_match(&self, text: &str) -> IntentResult {
        let lower = text.to_lowercase();
        let mut best: Option<(&IntentRule, f32)> = None;

        for rule in &self.rules {
            let score = rule.score(&lower);
            if score <= 0.0 {
                continue;
            }
            match best {
                Some((_, prev)) if score <= prev => {}
                _ => best = Some((rule, score)),
            }
        }

        match best {
            Some((rule, score)) => IntentResult {
                name: rule.intent.clone(),
                confidence: score,
                entities: self.extractor.extract(&rule.intent, text),
                suggested_handler: rule.suggested_handler.clone(),
                requires_handoff: false,
                source: IntentSource::Rule,
            },
            None => IntentResult::unknown(),
        }
    }

    /// 强制升级关键词与显式转人工意图不看分数；低置信度也转人工
    fn needs_handoff(&self, text: &str, result: &IntentResult) -> bool {
        let lower = text.to_lowercase();
        if self.escalation_keywords.iter().any(|k| lower.contains(k)) {
            return true;
        }
        if result.name == "human_handoff" {
            return true;
        }
        result.confidence < self.handoff_threshold
    }

    fn handler_for(&self, intent: &str) -> String {
        self.rules
            .iter()
            .find(|r| r.intent == intent)
            .map(|r| r.suggested_handler.clone())
            .unwrap_or_else(|| "fallback".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::external::ExternalIntent;
    use super::*;
    use async_trait::async_trait;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(rules::default_rules(), &ClassifierSection::default())
    }

    struct FixedExternal(ExternalIntent);

    #[async_trait]
    impl ExternalClassifier for FixedExternal {
        async fn classify(
            &self,
            _text: &str,
            _recent: &[ChatMessage],
        ) -> Result<ExternalIntent, String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenExternal;

    #[async_trait]
    impl ExternalClassifier for BrokenExternal {
        async fn classify(
            &self,
            _text: &str,
            _recent: &[ChatMessage],
        ) -> Result<ExternalIntent, String> {
            Err("backend unavailable".to_string())
        }
    }

    #[tokio::test]
    async fn test_product_inquiry_scores_high() {
        let result = classifier().classify("show me laptops", &[]).await;
        assert_eq!(result.name, "product_inquiry");
        assert!((result.confidence - 0.85).abs() < f32::EPSILON);
        assert_eq!(result.suggested_handler, "product_agent");
        assert!(!result.requires_handoff);
    }

    #[tokio::test]
    async fn test_escalation_keyword_overrides_confidence() {
        // "fraude" 规则得分可以很高，但关键词命中必须短路转人工
        let result = classifier()
            .classify("quiero denunciar un fraude con mi pedido 123456", &[])
            .await;
        assert!(result.requires_handoff);
    }

    #[tokio::test]
    async fn test_unknown_text_requests_handoff_by_low_confidence() {
        let result = classifier().classify("xyzzy plugh", &[]).await;
        assert_eq!(result.name, "unknown");
        assert!(result.confidence < 0.4);
        assert!(result.requires_handoff);
    }

    #[tokio::test]
    async fn test_external_wins_only_with_strictly_higher_confidence() {
        // 规则对 "laptop" 给 0.60，外部 0.60 平手时必须保留规则结果
        let ext = Arc::new(FixedExternal(ExternalIntent {
            intent: "order_status".to_string(),
            confidence: 0.60,
        }));
        let result = classifier()
            .with_external(ext)
            .classify("laptop", &[])
            .await;
        assert_eq!(result.name, "product_inquiry");
        assert_eq!(result.source, IntentSource::Rule);
    }

    #[tokio::test]
    async fn test_external_adopted_when_higher() {
        let ext = Arc::new(FixedExternal(ExternalIntent {
            intent: "appointment_booking".to_string(),
            confidence: 0.9,
        }));
        let result = classifier()
            .with_external(ext)
            .classify("necesito ver a alguien la semana que viene", &[])
            .await;
        assert_eq!(result.name, "appointment_booking");
        assert_eq!(result.source, IntentSource::External);
        assert_eq!(result.suggested_handler, "appointment_agent");
    }

    #[tokio::test]
    async fn test_external_failure_degrades_to_rule_result() {
        let before = classifier().classify("laptop", &[]).await;
        let after = classifier()
            .with_external(Arc::new(BrokenExternal))
            .classify("laptop", &[])
            .await;
        assert_eq!(before.name, after.name);
        assert_eq!(before.confidence, after.confidence);
    }

    #[tokio::test]
    async fn test_explicit_human_request_is_handoff() {
        let result = classifier()
            .classify("quiero hablar con una persona real", &[])
            .await;
        assert!(result.requires_handoff);
    }
}
