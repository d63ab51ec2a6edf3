//! Wasp - GitHub MCP 智能体
//!
//! 入口：初始化日志、加载配置、拉起代理进程并完成 MCP 握手，
//! 然后把命令行任务交给 ReAct 循环，结束后打印轨迹与按工具统计。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wasp::config::load_config;
use wasp::interact::ConsoleProvider;
use wasp::llm::OpenAiClient;
use wasp::react::{ParameterResolver, ReactAgent, ToolExecutor};
use wasp::rpc::{McpClient, StdioTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let config = load_config(None).context("Failed to load configuration")?;

    let task: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let task = if task.trim().is_empty() {
        "Show information about the authenticated GitHub user".to_string()
    } else {
        task
    };

    // 拉起代理进程并握手
    let transport = StdioTransport::spawn(&config.transport.command, &config.transport.args)
        .context("Failed to spawn tool proxy")?;
    let client = McpClient::new(Arc::new(transport));

    let init = client
        .initialize("wasp", env!("CARGO_PKG_VERSION"))
        .await
        .context("MCP initialize failed")?;
    tracing::info!(
        server = %init.server_info.name,
        version = %init.server_info.version,
        protocol = %init.protocol_version,
        "connected to tool server"
    );

    // 对端未声明工具能力时不再请求目录
    let tools = if init.capabilities.tools.is_some() {
        client.list_tools().await.context("tools/list failed")?
    } else {
        Vec::new()
    };
    tracing::info!(count = tools.len(), "tool catalog loaded");

    let llm = Arc::new(OpenAiClient::new(
        config.llm.base_url.as_deref(),
        &config.llm.model,
        None,
        config.llm.max_tokens,
    ));
    let provider = Arc::new(ConsoleProvider::new());
    let resolver = ParameterResolver::new(provider.clone(), config.agent.resolver_max_retries);
    let executor = ToolExecutor::new(client, resolver.clone())
        .with_max_attempts(config.agent.executor_max_attempts)
        .with_backoff(Duration::from_secs(config.agent.backoff_secs));

    // Ctrl+C 触发取消令牌，当前动作完成后优雅收尾
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let agent = ReactAgent::new(
        llm,
        executor,
        resolver,
        provider,
        tools,
        config.agent.max_iterations,
    )
    .with_cancel_token(cancel);

    let report = agent.run(&task).await.context("Agent run failed")?;

    println!("\n=== Run {} ===", report.run_id);
    println!("Task: {}", report.task);
    println!(
        "Iterations: {}  Complete: {}  Cancelled: {}",
        report.iterations, report.task_complete, report.cancelled
    );
    println!("\n--- Transcript ---\n{}", report.transcript.render());

    if report.stats.total_invocations() > 0 {
        println!("--- Tool usage ---");
        for (name, stat) in report.stats.iter() {
            println!("  {}: {} ok, {} failed", name, stat.successes, stat.errors);
            for message in &stat.error_messages {
                println!("    error: {}", message);
            }
        }
    }

    Ok(())
}
