//! 认知层：动作解析、参数收集、工具执行、完成判定、ReAct 主循环

pub mod executor;
pub mod loop_;
pub mod oracle;
pub mod parser;
pub mod prompt;
pub mod resolver;
pub mod transcript;

pub use executor::{ExecResult, ExecutionOutcome, Outcome, OutcomeClassifier, SubstringClassifier, ToolExecutor};
pub use loop_::{ReactAgent, RunReport};
pub use parser::{parse_action, thought_prefix, ParsedAction};
pub use resolver::{ParameterResolver, ResolveOutcome};
pub use transcript::{ReasoningStep, ToolUsageStat, ToolUsageStats, Transcript};
