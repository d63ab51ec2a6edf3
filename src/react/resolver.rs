//! 参数收集：补全并校验一次工具调用的参数表
//!
//! 显式有界循环（非递归）：每轮先按 schema 的 required 集合划分缺失字段，
//! required 必须回答（空回答重入整段收集并消耗一次重试），optional 只问一次、
//! 空回答即省略；收集后整体校验（required 非空、enum 在声明集合内），
//! 校验失败同样重入整段收集。Provider 取消立即短路，不再重试。

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::ToolDescriptor;
use crate::interact::{FieldAnswer, InteractionProvider};

/// 一次收集的三种合法结局
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// 完整且通过校验的参数表
    Resolved(Map<String, Value>),
    /// 用户取消（终局，不再重试）
    Cancelled,
    /// 超过重试上限
    Failed(String),
}

/// 参数收集器：持有交互 Provider 与整段收集的重试上限
#[derive(Clone)]
pub struct ParameterResolver {
    provider: Arc<dyn InteractionProvider>,
    max_retries: u32,
}

impl ParameterResolver {
    pub fn new(provider: Arc<dyn InteractionProvider>, max_retries: u32) -> Self {
        Self {
            provider,
            max_retries,
        }
    }

    /// 补全 seed 中缺失的字段；无缺失时恒等返回
    pub async fn resolve(&self, tool: &ToolDescriptor, seed: &Map<String, Value>) -> ResolveOutcome {
        let (missing_required, missing_optional) = partition_missing(tool, seed);
        if missing_required.is_empty() && missing_optional.is_empty() {
            // 恒等路径：不触发交互，也不做额外校验
            return ResolveOutcome::Resolved(seed.clone());
        }

        let mut args = seed.clone();
        let mut asked_optional: HashSet<String> = HashSet::new();
        let mut attempt = 0u32;

        loop {
            if attempt >= self.max_retries {
                return ResolveOutcome::Failed(format!(
                    "parameter collection for '{}' exceeded {} attempts",
                    tool.name, self.max_retries
                ));
            }
            attempt += 1;

            let (missing_required, missing_optional) = partition_missing(tool, &args);

            let mut reenter = false;
            for field in &missing_required {
                match self
                    .provider
                    .resolve_field(&tool.name, field, tool.property(field), true)
                    .await
                {
                    FieldAnswer::Cancelled => return ResolveOutcome::Cancelled,
                    FieldAnswer::Value(v) if v.trim().is_empty() => {
                        // required 不接受空回答：整段重入，消耗一次重试
                        tracing::warn!(tool = %tool.name, field = %field, "empty answer for required field");
                        reenter = true;
                        break;
                    }
                    FieldAnswer::Value(v) => {
                        args.insert(field.clone(), Value::String(v));
                    }
                }
            }
            if reenter {
                continue;
            }

            for field in &missing_optional {
                if !asked_optional.insert(field.clone()) {
                    continue;
                }
                match self
                    .provider
                    .resolve_field(&tool.name, field, tool.property(field), false)
                    .await
                {
                    FieldAnswer::Cancelled => return ResolveOutcome::Cancelled,
                    FieldAnswer::Value(v) if v.trim().is_empty() => {
                        // optional 空回答即省略该字段
                    }
                    FieldAnswer::Value(v) => {
                        args.insert(field.clone(), Value::String(v));
                    }
                }
            }

            if let Err((field, reason)) = validate(tool, &args) {
                tracing::warn!(tool = %tool.name, %reason, "argument validation failed, retrying collection");
                // 违例字段清掉并允许再次询问，否则重入无从修正
                args.remove(&field);
                asked_optional.remove(&field);
                continue;
            }
            return ResolveOutcome::Resolved(args);
        }
    }
}

/// 值是否视为缺失：不存在、null 或空白字符串
fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// 按 schema 划分缺失字段：(missing_required, missing_optional)
pub(crate) fn partition_missing(
    tool: &ToolDescriptor,
    args: &Map<String, Value>,
) -> (Vec<String>, Vec<String>) {
    let mut missing_required = Vec::new();
    for field in tool.required_fields() {
        if is_empty_value(args.get(field)) {
            missing_required.push(field.to_string());
        }
    }
    let mut missing_optional = Vec::new();
    for field in tool.optional_fields() {
        if is_empty_value(args.get(field)) {
            missing_optional.push(field.to_string());
        }
    }
    (missing_required, missing_optional)
}

/// 收集后的整体校验：required 非空、enum 字段取值在声明集合内
///
/// 失败时返回 (违例字段, 原因)，供调用方清除该字段后重入收集。
fn validate(tool: &ToolDescriptor, args: &Map<String, Value>) -> Result<(), (String, String)> {
    for field in tool.required_fields() {
        if is_empty_value(args.get(field)) {
            return Err((
                field.to_string(),
                format!("required field '{}' is empty", field),
            ));
        }
    }
    for (field, schema) in &tool.input_schema.properties {
        let Some(allowed) = &schema.enum_values else {
            continue;
        };
        let Some(value) = args.get(field) else {
            continue;
        };
        if is_empty_value(Some(value)) {
            continue;
        }
        let matches = value
            .as_str()
            .map(|s| allowed.iter().any(|a| a == s))
            .unwrap_or(false);
        if !matches {
            return Err((
                field.clone(),
                format!("field '{}' must be one of [{}]", field, allowed.join(", ")),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InputSchema, PropertySchema, ToolDescriptor};
    use crate::interact::ScriptedProvider;

    fn issue_tool() -> ToolDescriptor {
        let mut properties = std::collections::BTreeMap::new();
        for key in ["owner", "repo", "title"] {
            properties.insert(key.to_string(), PropertySchema::default());
        }
        properties.insert(
            "state".to_string(),
            PropertySchema {
                kind: "string".to_string(),
                description: None,
                enum_values: Some(vec!["open".to_string(), "closed".to_string()]),
            },
        );
        ToolDescriptor {
            name: "create_issue".to_string(),
            description: "Create a new issue.".to_string(),
            category: "Issues".to_string(),
            input_schema: InputSchema {
                kind: "object".to_string(),
                properties,
                required: vec!["owner".to_string(), "repo".to_string(), "title".to_string()],
            },
        }
    }

    fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_identity_when_nothing_missing() {
        let provider = Arc::new(ScriptedProvider::new());
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[
            ("owner", "acme"),
            ("repo", "site"),
            ("title", "Add docs"),
            ("state", "open"),
        ]);

        match resolver.resolve(&issue_tool(), &seed).await {
            ResolveOutcome::Resolved(out) => assert_eq!(out, seed),
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_required_is_collected() {
        // title 缺失，state 为 optional 也会被问一次（回空省略）
        let provider = Arc::new(
            ScriptedProvider::new().with_answers(["Add docs", ""]),
        );
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[("owner", "acme"), ("repo", "site")]);

        match resolver.resolve(&issue_tool(), &seed).await {
            ResolveOutcome::Resolved(out) => {
                assert_eq!(out["title"], "Add docs");
                assert_eq!(out["owner"], "acme");
                assert_eq!(out["repo"], "site");
                assert!(!out.contains_key("state"));
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_required_answer_consumes_retry() {
        // 两轮空回答 + 一轮有效回答，上限 3 内成功
        let provider = Arc::new(
            ScriptedProvider::new().with_answers(["", "", "Add docs", ""]),
        );
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[("owner", "acme"), ("repo", "site")]);

        match resolver.resolve(&issue_tool(), &seed).await {
            ResolveOutcome::Resolved(out) => assert_eq!(out["title"], "Add docs"),
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ceiling_exhaustion_fails() {
        let provider = Arc::new(ScriptedProvider::new().with_answers(["", "", ""]));
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[("owner", "acme"), ("repo", "site")]);

        match resolver.resolve(&issue_tool(), &seed).await {
            ResolveOutcome::Failed(reason) => assert!(reason.contains("create_issue")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new().with_cancel_on_field());
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[("owner", "acme"), ("repo", "site")]);

        assert!(matches!(
            resolver.resolve(&issue_tool(), &seed).await,
            ResolveOutcome::Cancelled
        ));
    }

    #[tokio::test]
    async fn test_enum_violation_retries_whole_collection() {
        // 第一轮 state 给了非法值，校验失败后重入；第二轮给合法值
        let provider = Arc::new(
            ScriptedProvider::new().with_answers(["Add docs", "sideways", "open"]),
        );
        let resolver = ParameterResolver::new(provider, 3);
        let seed = args(&[("owner", "acme"), ("repo", "site")]);

        match resolver.resolve(&issue_tool(), &seed).await {
            ResolveOutcome::Resolved(out) => {
                assert_eq!(out["title"], "Add docs");
                assert_eq!(out["state"], "open");
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
    }
}
