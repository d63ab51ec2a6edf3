//! LLM 层：消息、客户端抽象与实现（OpenAI 兼容 / Scripted）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use message::{Message, Role};
pub use mock::ScriptedLlm;
pub use openai::OpenAiClient;
pub use traits::LlmClient;
