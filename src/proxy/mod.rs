//! 代理层：上游会话管理与 stdio 服务端

pub mod server;
pub mod upstream;

pub use server::{ProxyServer, LOCAL_TOKEN_TOOL};
pub use upstream::{HttpBackend, UpstreamClient, UpstreamError, UpstreamHttp, UpstreamReply};
