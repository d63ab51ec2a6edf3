//! 交互层：字段补全与检查点确认的可插拔 Provider
//!
//! 参数收集与完成检查点都通过该 trait 走交互介质（控制台 / 脚本回放），
//! 核心逻辑不感知具体介质；任何一处取消都会向上传播为整轮终止。

pub mod console;
pub mod scripted;

use async_trait::async_trait;

use crate::catalog::PropertySchema;

pub use console::ConsoleProvider;
pub use scripted::ScriptedProvider;

/// 单字段补全的回答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAnswer {
    Value(String),
    Cancelled,
}

/// 检查点确认的回答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancelled,
}

/// 交互 Provider：逐字段补全 + 是/否确认
#[async_trait]
pub trait InteractionProvider: Send + Sync {
    /// 请求某工具缺失字段的值；required 决定提示语气，schema 提供类型与枚举
    async fn resolve_field(
        &self,
        tool: &str,
        field: &str,
        schema: Option<&PropertySchema>,
        required: bool,
    ) -> FieldAnswer;

    /// 是/否确认（完成检查点）
    async fn confirm(&self, prompt: &str) -> Confirmation;
}
