//! ReAct 主循环
//!
//! 每轮：渲染 prompt -> 调模型 -> 解析动作 -> 补全参数 -> 执行 -> 记录观察；
//! 无动作时整段回复当作 Thought 并做完成短语匹配。每轮结束后询问外部检查点。
//! 终止条件：短语命中、检查点确认、用户取消、迭代上限（按未完成上报）、
//! 或某轮内未分类错误（中止本次运行）。严格顺序执行，单轮内无并发工具调用。

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::ToolDescriptor;
use crate::core::AgentError;
use crate::interact::{Confirmation, InteractionProvider};
use crate::llm::{LlmClient, Message};
use crate::react::executor::{ExecResult, ToolExecutor};
use crate::react::oracle;
use crate::react::parser::{parse_action, thought_prefix};
use crate::react::prompt::render_prompt;
use crate::react::resolver::{ParameterResolver, ResolveOutcome};
use crate::react::transcript::{ToolUsageStats, Transcript};

/// 检查点提问文案
const CHECKPOINT_PROMPT: &str = "Is the task complete?";

/// 一次运行的产出：完整轨迹与按工具统计，渲染交给调用方
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub task: String,
    pub transcript: Transcript,
    pub stats: ToolUsageStats,
    pub task_complete: bool,
    pub cancelled: bool,
    pub iterations: usize,
}

/// ReAct 智能体：持有模型、执行器、交互 Provider 与工具目录
pub struct ReactAgent {
    llm: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    resolver: ParameterResolver,
    provider: Arc<dyn InteractionProvider>,
    tools: Vec<ToolDescriptor>,
    max_iterations: usize,
    cancel_token: CancellationToken,
}

impl ReactAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: ToolExecutor,
        resolver: ParameterResolver,
        provider: Arc<dyn InteractionProvider>,
        tools: Vec<ToolDescriptor>,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            executor,
            resolver,
            provider,
            tools,
            max_iterations,
            cancel_token: CancellationToken::new(),
        }
    }

    /// 注入外部取消令牌（如 Ctrl+C）
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    fn find_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// 运行一个任务直至终止；仅模型层等未分类错误以 Err 上抛
    pub async fn run(&self, task: &str) -> Result<RunReport, AgentError> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, task, "agent run started");

        let mut transcript = Transcript::new();
        let mut stats = ToolUsageStats::new();
        let mut task_complete = false;
        let mut cancelled = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            if self.cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }
            iterations += 1;

            let prompt = render_prompt(task, &self.tools, &transcript);
            let output = self
                .llm
                .complete(&[Message::user(prompt)])
                .await
                .map_err(AgentError::LlmError)?;

            match parse_action(&output) {
                Some(action) => match self.find_tool(&action.tool_name).cloned() {
                    None => {
                        // 工具不在目录：失败观察，不执行，循环继续
                        tracing::warn!(tool = %action.tool_name, "model requested unknown tool");
                        transcript.push_observation(
                            format!("Tool '{}' is not in the catalog", action.tool_name),
                            false,
                            Some(AgentError::ToolNotFound(action.tool_name.clone()).to_string()),
                        );
                    }
                    Some(tool) => {
                        let thought = thought_prefix(&output)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("Invoking tool '{}'", tool.name));
                        transcript.push_thought(thought);

                        match self.resolver.resolve(&tool, &action.parameters).await {
                            ResolveOutcome::Cancelled => {
                                cancelled = true;
                                transcript.push_observation(
                                    format!(
                                        "Cancelled while collecting arguments for '{}'",
                                        tool.name
                                    ),
                                    false,
                                    Some(AgentError::Cancelled.to_string()),
                                );
                                break;
                            }
                            ResolveOutcome::Failed(reason) => {
                                // 收集失败：失败观察，循环继续，不计工具统计
                                let error = AgentError::ParameterResolution(reason).to_string();
                                transcript.push_observation(error.clone(), false, Some(error));
                            }
                            ResolveOutcome::Resolved(args) => {
                                transcript.push_action(&tool.name, Value::Object(args.clone()));

                                match self.executor.execute(&tool, &args).await {
                                    ExecResult::Cancelled => {
                                        cancelled = true;
                                        transcript.push_observation(
                                            format!("Cancelled while executing '{}'", tool.name),
                                            false,
                                            Some(AgentError::Cancelled.to_string()),
                                        );
                                        break;
                                    }
                                    ExecResult::Completed(outcome) => {
                                        // 尝试终结，此处才更新统计
                                        if outcome.success {
                                            stats.record_success(&tool.name);
                                            transcript.push_observation(outcome.content, true, None);
                                        } else {
                                            let error = outcome
                                                .error
                                                .unwrap_or_else(|| "tool call failed".to_string());
                                            stats.record_error(&tool.name, error.clone());
                                            transcript.push_observation(
                                                error.clone(),
                                                false,
                                                Some(error),
                                            );
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                None => {
                    // 无动作：整段回复是 Thought，做完成短语匹配
                    transcript.push_thought(output.clone());
                    if oracle::is_completion(&output) {
                        task_complete = true;
                        break;
                    }
                }
            }

            // 每轮结束后的外部检查点；肯定答复无条件终止
            match self.provider.confirm(CHECKPOINT_PROMPT).await {
                Confirmation::Yes => {
                    task_complete = true;
                    break;
                }
                Confirmation::Cancelled => {
                    cancelled = true;
                    break;
                }
                Confirmation::No => {}
            }
        }

        tracing::info!(
            %run_id,
            iterations,
            task_complete,
            cancelled,
            invocations = stats.total_invocations(),
            "agent run finished"
        );

        Ok(RunReport {
            run_id,
            task: task.to_string(),
            transcript,
            stats,
            task_complete,
            cancelled,
            iterations,
        })
    }
}
