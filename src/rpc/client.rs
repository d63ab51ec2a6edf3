//! MCP 客户端：在传输通道上封装 initialize / tools/list / tools/call
//!
//! 返回值做了最小强类型化；tools/call 的内容级错误（result 内的 error 对象）
//! 不转成 Err，而是留在 ToolCallReply 里交给上层分类器判断。

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::catalog::ToolDescriptor;
use crate::core::AgentError;
use crate::rpc::codec::PROTOCOL_VERSION;
use crate::rpc::transport::ToolTransport;

/// initialize 的结果
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    /// 对端是否暴露工具能力；None 时客户端不再请求 tools/list
    #[serde(default)]
    pub tools: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// tools/call 的结果：content 与内容级 error 互斥
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallReply {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub error: Option<ReplyError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

impl ToolCallReply {
    /// 拍平为单段文本：错误时为错误消息，否则拼接各 content 段
    pub fn text(&self) -> String {
        if let Some(err) = &self.error {
            return err.message.clone();
        }
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// MCP 客户端：持有传输通道，供执行器与入口使用
#[derive(Clone)]
pub struct McpClient {
    transport: Arc<dyn ToolTransport>,
}

impl McpClient {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self { transport }
    }

    /// initialize 握手：携带协议版本与客户端信息
    pub async fn initialize(&self, name: &str, version: &str) -> Result<InitializeResult, AgentError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": name, "version": version },
        });
        let result = self.transport.request("initialize", params).await?;
        serde_json::from_value(result).map_err(|e| AgentError::JsonParse(e.to_string()))
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        let result = self.transport.request("tools/list", json!({})).await?;
        let parsed: ToolsListResult =
            serde_json::from_value(result).map_err(|e| AgentError::JsonParse(e.to_string()))?;
        Ok(parsed.tools)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ToolCallReply, AgentError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.transport.request("tools/call", params).await?;
        serde_json::from_value(result).map_err(|e| AgentError::JsonParse(e.to_string()))
    }
}
