//! Wasp 代理进程
//!
//! stdio 上的行分隔 JSON-RPC 服务端：加载工具目录、建立上游会话客户端、
//! 进入主循环。日志写 stderr，stdout 专用于协议报文。

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wasp::catalog::CatalogStore;
use wasp::config::load_config;
use wasp::proxy::{HttpBackend, ProxyServer, UpstreamClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout 被协议占用，日志只能走 stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(None).context("Failed to load configuration")?;

    // 目录存储不可达为致命错误，绝不以空目录静默启动
    let catalog = CatalogStore::load(&config.proxy.catalog_path).with_context(|| {
        format!(
            "Failed to load tool catalog from {}",
            config.proxy.catalog_path.display()
        )
    })?;
    tracing::info!(count = catalog.len(), "tool catalog loaded");

    // 凭证可缺省：运行期可经 github_token 工具注入
    let bearer = std::env::var(&config.proxy.token_env).ok();
    if bearer.is_none() {
        tracing::warn!(
            env = %config.proxy.token_env,
            "no upstream credential in environment, waiting for github_token"
        );
    }

    let backend = Arc::new(HttpBackend::new(config.proxy.upstream_url.clone()));
    let upstream = Arc::new(UpstreamClient::new(backend, bearer));

    let server = ProxyServer::new(catalog, upstream);
    server
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Proxy loop failed")?;

    Ok(())
}
