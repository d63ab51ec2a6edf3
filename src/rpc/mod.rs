//! 传输层：JSON-RPC 报文、stdio 通道、MCP 客户端

pub mod client;
pub mod codec;
pub mod transport;

pub use client::{InitializeResult, McpClient, ToolCallReply};
pub use codec::{Request, Response, RpcError, JSONRPC_VERSION, PROTOCOL_VERSION};
pub use transport::{StdioTransport, ToolTransport};
