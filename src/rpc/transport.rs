//! 行分隔 JSON-RPC 传输通道
//!
//! StdioTransport 拉起工具进程（stderr 直通），对其 stdin 写一行请求、
//! 从其 stdout 读一行响应；严格一问一答，内部 Mutex 保证同一时刻只有一个在途请求。

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::core::AgentError;
use crate::rpc::codec::{Request, Response};

/// 传输通道 trait：发送一次请求并取回 result
///
/// 顶层 error 映射为 AgentError::Protocol；管道断开映射为 AgentError::Transport。
#[async_trait::async_trait]
pub trait ToolTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, AgentError>;
}

struct Inner {
    // Child 持有以保证进程随通道存活
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// 子进程 stdio 传输：请求 id 从 0 单调递增
pub struct StdioTransport {
    inner: Mutex<Inner>,
}

impl StdioTransport {
    /// 拉起工具进程并接管其 stdin/stdout
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, AgentError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| AgentError::Transport(format!("spawn {}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Transport("child stdout unavailable".to_string()))?;

        Ok(Self {
            inner: Mutex::new(Inner {
                _child: child,
                stdin,
                lines: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        })
    }
}

#[async_trait::async_trait]
impl ToolTransport for StdioTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, AgentError> {
        let mut inner = self.inner.lock().await;

        let id = inner.next_id;
        inner.next_id += 1;

        let req = Request::new(id, method, params);
        let mut line = serde_json::to_string(&req)
            .map_err(|e| AgentError::JsonParse(e.to_string()))?;
        line.push('\n');

        inner
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AgentError::Transport(format!("write: {}", e)))?;
        inner
            .stdin
            .flush()
            .await
            .map_err(|e| AgentError::Transport(format!("flush: {}", e)))?;

        let reply = inner
            .lines
            .next_line()
            .await
            .map_err(|e| AgentError::Transport(format!("read: {}", e)))?
            .ok_or_else(|| AgentError::Transport("channel closed by peer".to_string()))?;

        let resp: Response = serde_json::from_str(&reply)
            .map_err(|e| AgentError::JsonParse(format!("{}: {}", e, reply)))?;

        if let Some(err) = resp.error {
            return Err(AgentError::Protocol {
                code: err.code,
                message: err.message,
            });
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }
}
