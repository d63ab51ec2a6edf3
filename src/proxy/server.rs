//! 代理服务端：stdio 行分隔 JSON-RPC 入口
//!
//! initialize 与 tools/list 在本地应答（目录来自外部存储，不打扰上游）；
//! tools/call 默认转发上游，github_token 在本地截获用于注入凭证。
//! 内容级错误放在 result 内部的 error 对象里（调用方据此分类重试），
//! 只有报文级问题才用 JSON-RPC 顶层 error。畸形行记日志后跳过，不中断循环。

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::catalog::CatalogStore;
use crate::core::AgentError;
use crate::proxy::upstream::{UpstreamClient, UpstreamError};
use crate::rpc::codec::{Request, Response, PROTOCOL_VERSION};

/// 本地截获的凭证注入工具
pub const LOCAL_TOKEN_TOOL: &str = "github_token";

/// 代理服务端：目录 + 上游会话客户端
pub struct ProxyServer {
    catalog: CatalogStore,
    upstream: Arc<UpstreamClient>,
}

impl ProxyServer {
    pub fn new(catalog: CatalogStore, upstream: Arc<UpstreamClient>) -> Self {
        Self { catalog, upstream }
    }

    /// 主循环：逐行读请求、写应答；EOF 退出
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<(), AgentError>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed request line");
                    Response::error(None, -32700, format!("Parse error: {}", e))
                }
            };

            let out = serde_json::to_string(&response)
                .map_err(|e| AgentError::JsonParse(e.to_string()))?;
            writer
                .write_all(out.as_bytes())
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
            writer
                .write_all(b"\n")
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
            writer
                .flush()
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
        }

        tracing::info!("client closed stdin, proxy shutting down");
        Ok(())
    }

    /// 分发单个请求
    pub async fn handle(&self, request: Request) -> Response {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_list(request.id),
            "tools/call" => self.handle_call(request.id, request.params).await,
            other => Response::error(
                Some(request.id),
                -32601,
                format!("Method not found: {}", other),
            ),
        }
    }

    fn handle_initialize(&self, id: u64) -> Response {
        Response::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": true } },
                "serverInfo": {
                    "name": "wasp-proxy",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    fn handle_list(&self, id: u64) -> Response {
        let tools: Vec<Value> = self
            .catalog
            .descriptors()
            .iter()
            .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
            .collect();
        Response::result(id, json!({ "tools": tools }))
    }

    async fn handle_call(&self, id: u64, params: Value) -> Response {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::error(Some(id), -32602, "Missing tool name");
        };

        if name == LOCAL_TOKEN_TOOL {
            return self.handle_token(id, &params).await;
        }

        // 目录是工具面的事实来源；目录外的名字不转发
        if self.catalog.get(name).is_none() {
            return content_error(id, -32602, format!("Tool not found: {}", name));
        }

        tracing::debug!(tool = name, "forwarding tool call upstream");
        match self.upstream.call("tools/call", params).await {
            Ok(result) => Response::result(id, result),
            Err(UpstreamError::Protocol { code, message }) => content_error(id, code, message),
            Err(e) => content_error(id, -32000, e.to_string()),
        }
    }

    /// github_token：在本地吞掉凭证，绝不转发上游
    async fn handle_token(&self, id: u64, params: &Value) -> Response {
        let token = params
            .get("arguments")
            .and_then(|a| a.get("token"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                self.upstream.set_bearer(token.to_string()).await;
                Response::result(
                    id,
                    json!({ "content": [{ "type": "text", "text": "GitHub token updated." }] }),
                )
            }
            None => content_error(id, -32602, "Missing parameter: token"),
        }
    }
}

/// 内容级错误：错误对象放在 result 内部，顶层仍是成功应答
fn content_error(id: u64, code: i64, message: impl Into<String>) -> Response {
    Response::result(
        id,
        json!({ "error": { "code": code, "message": message.into() } }),
    )
}
