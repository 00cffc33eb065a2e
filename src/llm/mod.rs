//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）
//!
//! 引擎核心不直接生成文本；LLM 只作为意图分类的外部语义兜底，
//! 以及个别 Handler 的可选依赖。

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;
