//! 推理轨迹与工具统计
//!
//! Transcript 只追加、不重排、不原地修改；渲染结果作为后续 prompt 的上下文。
//! 工具统计只在一次执行尝试终结时更新，重试中途不计。

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// 单步推理：思考 / 动作 / 观察
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReasoningStep {
    Thought {
        content: String,
    },
    Action {
        tool: String,
        arguments: Value,
    },
    Observation {
        content: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// 只追加的推理轨迹
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    steps: Vec<ReasoningStep>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_thought(&mut self, content: impl Into<String>) {
        self.steps.push(ReasoningStep::Thought {
            content: content.into(),
        });
    }

    pub fn push_action(&mut self, tool: impl Into<String>, arguments: Value) {
        self.steps.push(ReasoningStep::Action {
            tool: tool.into(),
            arguments,
        });
    }

    pub fn push_observation(
        &mut self,
        content: impl Into<String>,
        success: bool,
        error: Option<String>,
    ) {
        self.steps.push(ReasoningStep::Observation {
            content: content.into(),
            success,
            error,
        });
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 渲染为 prompt 片段
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                ReasoningStep::Thought { content } => {
                    out.push_str(&format!("Thought: {}\n", content));
                }
                ReasoningStep::Action { tool, arguments } => {
                    out.push_str(&format!("Action: {} {}\n", tool, arguments));
                }
                ReasoningStep::Observation {
                    content, success, ..
                } => {
                    let tag = if *success { "ok" } else { "failed" };
                    out.push_str(&format!("Observation ({}): {}\n", tag, content));
                }
            }
        }
        out
    }
}

/// 单个工具的使用统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolUsageStat {
    pub successes: u32,
    pub errors: u32,
    pub error_messages: Vec<String>,
}

/// 一次 Agent 运行范围内的按工具统计
#[derive(Debug, Clone, Default)]
pub struct ToolUsageStats {
    per_tool: BTreeMap<String, ToolUsageStat>,
}

impl ToolUsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, tool: &str) {
        self.per_tool.entry(tool.to_string()).or_default().successes += 1;
    }

    pub fn record_error(&mut self, tool: &str, message: impl Into<String>) {
        let stat = self.per_tool.entry(tool.to_string()).or_default();
        stat.errors += 1;
        stat.error_messages.push(message.into());
    }

    pub fn get(&self, tool: &str) -> Option<&ToolUsageStat> {
        self.per_tool.get(tool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolUsageStat)> {
        self.per_tool.iter()
    }

    pub fn total_invocations(&self) -> u32 {
        self.per_tool.values().map(|s| s.successes + s.errors).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.per_tool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_append_order() {
        let mut t = Transcript::new();
        t.push_thought("think");
        t.push_action("echo", serde_json::json!({"message": "hi"}));
        t.push_observation("hi", true, None);

        assert_eq!(t.len(), 3);
        assert!(matches!(t.steps()[0], ReasoningStep::Thought { .. }));
        assert!(matches!(t.steps()[2], ReasoningStep::Observation { .. }));

        let rendered = t.render();
        let thought_pos = rendered.find("Thought").unwrap();
        let obs_pos = rendered.find("Observation").unwrap();
        assert!(thought_pos < obs_pos);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = ToolUsageStats::new();
        stats.record_success("echo");
        stats.record_error("echo", "boom");
        stats.record_error("echo", "bang");

        let stat = stats.get("echo").unwrap();
        assert_eq!(stat.successes, 1);
        assert_eq!(stat.errors, 2);
        assert_eq!(stat.error_messages, vec!["boom", "bang"]);
        assert_eq!(stats.total_invocations(), 3);
    }
}
