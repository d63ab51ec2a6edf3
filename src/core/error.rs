//! Agent 错误类型
//!
//! 各错误类别对应不同的处置：解析错误在循环内本地恢复（整段文本当作 Thought 继续）、
//! 参数错误有界重试、传输错误固定退避重试、取消则整轮优雅终止。
//! 所有上抛的错误最终都以人类可读文本落在一条 Observation 上。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（解析、参数、传输、协议、取消等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 动作文本或响应 JSON 无法解析
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 管道 / 网络层失败（退避重试，耗尽预算后上抛）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 对端返回的顶层 JSON-RPC 错误（不可重试，立即上抛）
    #[error("Protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// 模型请求的工具不在目录中（记为失败 Observation，循环继续）
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// 参数收集超过重试上限（对该次调用终局）
    #[error("Parameter resolution failed: {0}")]
    ParameterResolution(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    Config(String),

    /// 用户取消：整轮终止，属正常退出而非故障
    #[error("Cancelled by user")]
    Cancelled,
}
