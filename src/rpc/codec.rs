//! JSON-RPC 2.0 报文（行分隔）
//!
//! 请求与响应各占一行 JSON；id 为进程生命周期内从 0 单调递增的整数。

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP 协议版本（initialize 握手时双方交换）
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC 请求：{jsonrpc, method, params, id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: u64,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 响应：result 与 error 互斥
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<u64>,
}

/// 错误对象：{code, message}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Response {
    pub fn result(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    pub fn error(id: Option<u64>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req = Request::new(0, "tools/list", serde_json::json!({}));
        let line = serde_json::to_string(&req).unwrap();
        let back: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(back["jsonrpc"], "2.0");
        assert_eq!(back["method"], "tools/list");
        assert_eq!(back["id"], 0);
    }

    #[test]
    fn test_response_result_omits_error() {
        let resp = Response::result(3, serde_json::json!({"ok": true}));
        let line = serde_json::to_string(&resp).unwrap();
        assert!(!line.contains("\"error\""));
        let back: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(back.id, Some(3));
        assert!(back.error.is_none());
    }
}
