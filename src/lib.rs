//! Wasp - GitHub MCP 智能体与会话代理
//!
//! 模块划分：
//! - **catalog**: 工具描述符与外部目录存储
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类
//! - **interact**: 交互 Provider（控制台 / 脚本化）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **proxy**: 上游会话管理与 stdio 代理服务端
//! - **react**: 动作解析、参数收集、执行监管、ReAct 主循环
//! - **rpc**: 行分隔 JSON-RPC 报文、传输通道与 MCP 客户端

pub mod catalog;
pub mod config;
pub mod core;
pub mod interact;
pub mod llm;
pub mod proxy;
pub mod react;
pub mod rpc;
