//! 上游会话客户端：持有 GitHub MCP 后端的会话令牌并处理过期
//!
//! 状态机 NoSession -> Active：任一转发在无会话时先做 initialize 握手，
//! 从响应头捕获会话令牌（若对端提供），之后的请求回带同名请求头。
//! 会话创建走单飞（single-flight）：Mutex 横跨整个握手持有，并发调用方
//! 等待同一次结果，不会出现竞争的创建者。4xx 且响应体含失效标记时，
//! 清除令牌、恰好一次重新握手并恰好一次重试原请求；重试再失效则上抛，
//! 绝不出现第三次握手。其余非成功响应立即上抛，不重试。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::rpc::codec::PROTOCOL_VERSION;

/// 会话令牌的请求/响应头名
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// 4xx 响应体中的会话失效标记（大小写不敏感匹配）
const INVALID_SESSION_MARKER: &str = "invalid session";

/// 上游调用错误
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Http(String),

    /// 会话失效信号（内部驱动一次重新握手；二次出现时原样上抛）
    #[error("upstream session expired")]
    SessionExpired,

    /// 上游返回的协议级错误，不可重试
    #[error("upstream error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// 尚未配置 Bearer 凭证（可经 github_token 工具注入）
    #[error("no upstream credential configured")]
    MissingCredential,
}

/// 一次上游 POST 的裸回应
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    /// 响应头中的会话令牌（若对端提供）
    pub session: Option<String>,
    pub body: Value,
}

/// HTTP 发送 seam：测试可注入假后端统计握手次数
#[async_trait]
pub trait UpstreamHttp: Send + Sync {
    async fn post(
        &self,
        body: &Value,
        bearer: &str,
        session: Option<&str>,
    ) -> Result<UpstreamReply, UpstreamError>;
}

/// reqwest 后端
pub struct HttpBackend {
    http: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl UpstreamHttp for HttpBackend {
    async fn post(
        &self,
        body: &Value,
        bearer: &str,
        session: Option<&str>,
    ) -> Result<UpstreamReply, UpstreamError> {
        let mut request = self
            .http
            .post(&self.url)
            .bearer_auth(bearer)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = session {
            request = request.header(SESSION_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Http(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(UpstreamReply {
            status,
            session,
            body,
        })
    }
}

/// 会话状态：未初始化，或已握手（令牌可为空，表示对端不签发会话）
#[derive(Debug, Clone, Default)]
enum SessionState {
    #[default]
    NoSession,
    Active {
        token: Option<String>,
    },
}

/// 上游会话客户端
pub struct UpstreamClient {
    backend: Arc<dyn UpstreamHttp>,
    /// Bearer 凭证；github_token 工具可在运行期替换
    bearer: RwLock<Option<String>>,
    /// 单飞锁：握手期间持有，并发调用方共享结果
    session: Mutex<SessionState>,
    next_id: AtomicU64,
    client_name: String,
    client_version: String,
}

impl UpstreamClient {
    pub fn new(backend: Arc<dyn UpstreamHttp>, bearer: Option<String>) -> Self {
        Self {
            backend,
            bearer: RwLock::new(bearer),
            session: Mutex::new(SessionState::NoSession),
            next_id: AtomicU64::new(0),
            client_name: "wasp-proxy".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 替换凭证并丢弃现有会话（新凭证必须重新握手）
    pub async fn set_bearer(&self, token: String) {
        *self.bearer.write().await = Some(token);
        *self.session.lock().await = SessionState::NoSession;
        tracing::info!("upstream credential replaced, session dropped");
    }

    pub async fn has_bearer(&self) -> bool {
        self.bearer.read().await.is_some()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn bearer(&self) -> Result<String, UpstreamError> {
        self.bearer
            .read()
            .await
            .clone()
            .ok_or(UpstreamError::MissingCredential)
    }

    /// 取现有会话或握手创建；锁横跨握手（单飞）
    async fn ensure_session(&self) -> Result<Option<String>, UpstreamError> {
        let mut state = self.session.lock().await;
        if let SessionState::Active { token } = &*state {
            return Ok(token.clone());
        }

        let token = self.handshake().await?;
        tracing::info!(has_token = token.is_some(), "upstream session established");
        *state = SessionState::Active {
            token: token.clone(),
        };
        Ok(token)
    }

    /// initialize 握手：携带协议元数据，捕获响应头中的会话令牌
    async fn handshake(&self) -> Result<Option<String>, UpstreamError> {
        let bearer = self.bearer().await?;
        let body = json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": self.client_name, "version": self.client_version },
            },
            "id": self.next_id(),
        });

        let reply = self.backend.post(&body, &bearer, None).await?;
        if !(200..300).contains(&reply.status) {
            return Err(UpstreamError::Protocol {
                code: reply.status as i64,
                message: body_preview(&reply.body),
            });
        }
        Ok(reply.session)
    }

    /// 仅当令牌仍是我们用过的那个时才作废（他人可能已刷新）
    async fn invalidate(&self, used: &Option<String>) {
        let mut state = self.session.lock().await;
        if let SessionState::Active { token } = &*state {
            if token == used {
                *state = SessionState::NoSession;
            }
        }
    }

    /// 转发一次调用：失效时恰好一次重新握手 + 恰好一次重试
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let token = self.ensure_session().await?;
        match self.send(method, &params, token.as_deref()).await {
            Err(UpstreamError::SessionExpired) => {
                tracing::warn!(method, "upstream session expired, re-initializing once");
                self.invalidate(&token).await;
                let token = self.ensure_session().await?;
                self.send(method, &params, token.as_deref()).await
            }
            other => other,
        }
    }

    async fn send(
        &self,
        method: &str,
        params: &Value,
        session: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let bearer = self.bearer().await?;
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id(),
        });

        let reply = self.backend.post(&body, &bearer, session).await?;

        if (400..500).contains(&reply.status) && is_invalid_session(&reply.body) {
            return Err(UpstreamError::SessionExpired);
        }
        if !(200..300).contains(&reply.status) {
            return Err(UpstreamError::Protocol {
                code: reply.status as i64,
                message: body_preview(&reply.body),
            });
        }

        if let Some(err) = reply.body.get("error") {
            return Err(UpstreamError::Protocol {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("upstream error")
                    .to_string(),
            });
        }
        Ok(reply.body.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn is_invalid_session(body: &Value) -> bool {
    let text = match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.to_lowercase().contains(INVALID_SESSION_MARKER)
}

fn body_preview(body: &Value) -> String {
    let text = match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.len() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// 假后端：统计握手次数，可按序注入会话失效
    struct FakeBackend {
        initializes: AtomicU32,
        calls: AtomicU32,
        /// 前 N 次 tools/call 回会话失效
        expire_first: AtomicU32,
    }

    impl FakeBackend {
        fn new(expire_first: u32) -> Arc<Self> {
            Arc::new(Self {
                initializes: AtomicU32::new(0),
                calls: AtomicU32::new(0),
                expire_first: AtomicU32::new(expire_first),
            })
        }
    }

    #[async_trait]
    impl UpstreamHttp for FakeBackend {
        async fn post(
            &self,
            body: &Value,
            _bearer: &str,
            session: Option<&str>,
        ) -> Result<UpstreamReply, UpstreamError> {
            let method = body["method"].as_str().unwrap_or("");
            if method == "initialize" {
                let n = self.initializes.fetch_add(1, Ordering::SeqCst);
                return Ok(UpstreamReply {
                    status: 200,
                    session: Some(format!("session-{}", n)),
                    body: json!({"jsonrpc": "2.0", "result": {"protocolVersion": "2025-03-26"}, "id": 0}),
                });
            }

            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(session.is_some(), "forwarded call must carry the session header");

            if self.expire_first.load(Ordering::SeqCst) > 0 {
                self.expire_first.fetch_sub(1, Ordering::SeqCst);
                return Ok(UpstreamReply {
                    status: 400,
                    session: None,
                    body: Value::String("Invalid session id".to_string()),
                });
            }

            Ok(UpstreamReply {
                status: 200,
                session: None,
                body: json!({"jsonrpc": "2.0", "result": {"content": [{"text": "ok"}]}, "id": 1}),
            })
        }
    }

    fn client(backend: Arc<FakeBackend>) -> UpstreamClient {
        UpstreamClient::new(backend, Some("ghp_test".to_string()))
    }

    #[tokio::test]
    async fn test_lazy_handshake_then_token_reuse() {
        let backend = FakeBackend::new(0);
        let c = client(backend.clone());

        c.call("tools/call", json!({"name": "get_me", "arguments": {}}))
            .await
            .unwrap();
        c.call("tools/call", json!({"name": "get_me", "arguments": {}}))
            .await
            .unwrap();

        // 两次转发共享一次握手
        assert_eq!(backend.initializes.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expiry_triggers_exactly_one_rehandshake() {
        let backend = FakeBackend::new(1);
        let c = client(backend.clone());

        let result = c
            .call("tools/call", json!({"name": "get_me", "arguments": {}}))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "ok");

        assert_eq!(backend.initializes.load(Ordering::SeqCst), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_expiry_is_terminal_no_third_handshake() {
        let backend = FakeBackend::new(2);
        let c = client(backend.clone());

        let err = c
            .call("tools/call", json!({"name": "get_me", "arguments": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::SessionExpired));

        // 初次 + 重试一次，绝无第三次握手
        assert_eq!(backend.initializes.load(Ordering::SeqCst), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_credential_is_surfaced() {
        let backend = FakeBackend::new(0);
        let c = UpstreamClient::new(backend, None);
        let err = c.call("tools/list", json!({})).await.unwrap_err();
        assert!(matches!(err, UpstreamError::MissingCredential));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_single_handshake() {
        let backend = FakeBackend::new(0);
        let c = Arc::new(client(backend.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = c.clone();
            handles.push(tokio::spawn(async move {
                c.call("tools/call", json!({"name": "get_me", "arguments": {}}))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(backend.initializes.load(Ordering::SeqCst), 1);
    }
}
