//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ORQUESTA__*` 覆盖（双下划线表示嵌套，
//! 如 `ORQUESTA__ORCHESTRATOR__MAX_ERRORS=5`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub llm: LlmSection,
}

/// [app] 段：应用名
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [orchestrator] 段：升级策略阈值与 Handler 超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// 错误预算：error_count 达到该值后转人工
    pub max_errors: u32,
    /// Handler 切换上限（含重复），超过后转人工
    pub max_handler_switches: usize,
    /// 单次 Handler 调用超时（秒），超时按失败处理
    pub handler_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_errors: 3,
            max_handler_switches: 5,
            handler_timeout_secs: 10,
        }
    }
}

/// [classifier] 段：规则/外部分类器阈值与强制升级关键词
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// 规则得分低于该值时调用外部语义分类器
    pub rule_confidence_threshold: f32,
    /// 置信度低于该值时 requires_handoff = true
    pub handoff_confidence_threshold: f32,
    /// 命中即转人工的关键词（法律/欺诈类），与置信度无关
    pub escalation_keywords: Vec<String>,
    /// 外部分类器调用超时（秒）
    pub external_timeout_secs: u64,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            rule_confidence_threshold: 0.7,
            handoff_confidence_threshold: 0.4,
            escalation_keywords: vec![
                "fraude".into(),
                "estafa".into(),
                "denuncia".into(),
                "demanda".into(),
                "abogado".into(),
                "legal".into(),
                "defensa del consumidor".into(),
            ],
            external_timeout_secs: 5,
        }
    }
}

/// [store] 段：检查点数据库路径；未设置时用内存存储（仅适合短生命周期部署）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreSection {
    pub db_path: Option<PathBuf>,
}

/// [llm] 段：外部语义分类器所用后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock；无 API Key 时自动回落 mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            orchestrator: OrchestratorSection::default(),
            classifier: ClassifierSection::default(),
            store: StoreSection::default(),
            llm: LlmSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 ORQUESTA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ORQUESTA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ORQUESTA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.orchestrator.max_errors, 3);
        assert_eq!(cfg.orchestrator.max_handler_switches, 5);
        assert_eq!(cfg.orchestrator.handler_timeout_secs, 10);
        assert!((cfg.classifier.rule_confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert!((cfg.classifier.handoff_confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert!(cfg.classifier.escalation_keywords.contains(&"fraude".to_string()));
    }
}
