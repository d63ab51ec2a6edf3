//! 工具执行器：派发 tools/call、分类结果、有界重试、统一尝试计数
//!
//! 两类可重试故障共用一个总尝试计数器（默认 3 次尝试 = 2 次重试）：
//! - 参数类错误：以原始参数为种子重入参数收集，再用补全后的参数重试
//!   （这是唯一会在重试间改变参数的路径）；
//! - 传输类失败：固定 1 秒退避后原参数重试。
//! 通用错误不重试，立即按失败终局。成功 = 传输未失败且最终一次的文本
//! 未触发通用错误分类。

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::catalog::ToolDescriptor;
use crate::react::resolver::{ParameterResolver, ResolveOutcome};
use crate::rpc::McpClient;

/// 结果文本的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// 缺参/参数无效类错误，可通过重新收集参数挽救
    ParameterError,
    /// 其余错误文本，不可重试
    GenericError,
}

/// 结果分类器 seam：子串启发式可替换为结构化状态通道
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Outcome;
}

/// 默认子串分类器（大小写不敏感；参数类优先于通用类）
pub struct SubstringClassifier;

const PARAMETER_MARKERS: &[&str] = &["missing parameter", "required field", "invalid argument"];
const GENERIC_MARKERS: &[&str] = &["error", "forbidden", "not found"];

impl OutcomeClassifier for SubstringClassifier {
    fn classify(&self, text: &str) -> Outcome {
        let lowered = text.to_lowercase();
        if PARAMETER_MARKERS.iter().any(|m| lowered.contains(m)) {
            return Outcome::ParameterError;
        }
        if GENERIC_MARKERS.iter().any(|m| lowered.contains(m)) {
            return Outcome::GenericError;
        }
        Outcome::Ok
    }
}

/// 一次执行的终局
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    fn ok(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
        }
    }
}

/// 执行结果：终局或用户在参数补全中取消
#[derive(Debug)]
pub enum ExecResult {
    Completed(ExecutionOutcome),
    Cancelled,
}

/// 工具执行器
pub struct ToolExecutor {
    client: McpClient,
    resolver: ParameterResolver,
    classifier: Arc<dyn OutcomeClassifier>,
    max_attempts: u32,
    backoff: Duration,
}

impl ToolExecutor {
    pub fn new(client: McpClient, resolver: ParameterResolver) -> Self {
        Self {
            client,
            resolver,
            classifier: Arc::new(SubstringClassifier),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn OutcomeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// 执行一次工具调用；attempt 计数对本次逻辑调用私有
    pub async fn execute(
        &self,
        tool: &ToolDescriptor,
        arguments: &Map<String, Value>,
    ) -> ExecResult {
        let original = arguments.clone();
        let mut args = arguments.clone();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let reply = match self.client.call_tool(&tool.name, &args).await {
                Ok(reply) => reply,
                Err(e) => {
                    // 传输/协议层失败：固定退避后原参数重试
                    tracing::warn!(tool = %tool.name, attempt, error = %e, "transport failure");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff).await;
                        continue;
                    }
                    return ExecResult::Completed(ExecutionOutcome::failed(e.to_string()));
                }
            };

            let text = reply.text();
            match self.classifier.classify(&text) {
                Outcome::Ok => return ExecResult::Completed(ExecutionOutcome::ok(text)),
                Outcome::ParameterError if attempt < self.max_attempts => {
                    tracing::info!(tool = %tool.name, attempt, "parameter error, re-collecting arguments");
                    match self.resolver.resolve(tool, &original).await {
                        ResolveOutcome::Resolved(resolved) => {
                            args = resolved;
                            continue;
                        }
                        ResolveOutcome::Cancelled => return ExecResult::Cancelled,
                        ResolveOutcome::Failed(reason) => {
                            return ExecResult::Completed(ExecutionOutcome::failed(reason));
                        }
                    }
                }
                Outcome::ParameterError | Outcome::GenericError => {
                    return ExecResult::Completed(ExecutionOutcome::failed(text));
                }
            }
        }
    }
}
