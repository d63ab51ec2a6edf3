//! Prompt 渲染：工具目录 + 动作格式 + 推理轨迹
//!
//! 动作块的 JSON 结构用 schemars 生成后注入 prompt，降低模型输出格式错误率。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};

use crate::catalog::ToolDescriptor;
use crate::react::transcript::Transcript;

/// 动作块格式：与解析器识别的 `Tool: <name>` + JSON 对象一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolActionFormat {
    /// 工具名，须取自 Available tools
    pub tool: String,
    /// 工具参数，键为字段名
    pub parameters: HashMap<String, String>,
}

/// 返回动作参数块的 JSON Schema 字符串，可拼入 prompt
pub fn action_format_schema_json() -> String {
    let schema = schema_for!(ToolActionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

/// 渲染单个工具的目录条目：描述、required/optional 字段与类型、枚举约束
fn render_tool(tool: &ToolDescriptor) -> String {
    let mut out = format!("- {} [{}]: {}\n", tool.name, tool.category, tool.description);

    let describe = |field: &str| -> String {
        match tool.property(field) {
            Some(schema) => {
                let mut desc = if schema.kind.is_empty() {
                    field.to_string()
                } else {
                    format!("{} ({})", field, schema.kind)
                };
                if let Some(values) = &schema.enum_values {
                    desc.push_str(&format!(" one of [{}]", values.join(", ")));
                }
                desc
            }
            None => field.to_string(),
        }
    };

    let required = tool.required_fields();
    if !required.is_empty() {
        let fields: Vec<String> = required.iter().map(|f| describe(f)).collect();
        out.push_str(&format!("  required: {}\n", fields.join(", ")));
    }
    let optional = tool.optional_fields();
    if !optional.is_empty() {
        let fields: Vec<String> = optional.iter().map(|f| describe(f)).collect();
        out.push_str(&format!("  optional: {}\n", fields.join(", ")));
    }
    out
}

/// 渲染一轮迭代的完整 prompt：任务、目录、动作格式说明、轨迹
pub fn render_prompt(task: &str, tools: &[ToolDescriptor], transcript: &Transcript) -> String {
    let mut out = String::new();

    out.push_str("You are an agent that completes tasks by invoking tools.\n\n");
    out.push_str("Available tools:\n");
    for tool in tools {
        out.push_str(&render_tool(tool));
    }

    out.push_str(
        "\nTo invoke a tool, reply with a line `Tool: <name>` followed by a JSON \
object of parameters, for example:\n\
Tool: echo\n\
Parameters:\n\
{\"message\": \"hello\"}\n\n",
    );
    out.push_str("The parameter block must match this schema:\n");
    out.push_str(&action_format_schema_json());
    out.push_str(
        "\n\nWhen the task is finished, reply without any tool invocation and \
state that the task is complete.\n",
    );

    if !transcript.is_empty() {
        out.push_str("\nProgress so far:\n");
        out.push_str(&transcript.render());
    }

    out.push_str(&format!("\nTask: {}\n", task));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InputSchema, PropertySchema};

    #[test]
    fn test_prompt_embeds_catalog_and_transcript() {
        let mut properties = std::collections::BTreeMap::new();
        properties.insert("message".to_string(), PropertySchema {
            kind: "string".to_string(),
            description: None,
            enum_values: None,
        });
        let tool = ToolDescriptor {
            name: "echo".to_string(),
            description: "Echoes back your input.".to_string(),
            category: "Custom".to_string(),
            input_schema: InputSchema {
                kind: "object".to_string(),
                properties,
                required: vec!["message".to_string()],
            },
        };

        let mut transcript = Transcript::new();
        transcript.push_thought("warming up");

        let prompt = render_prompt("say hi", &[tool], &transcript);
        assert!(prompt.contains("echo [Custom]"));
        assert!(prompt.contains("required: message (string)"));
        assert!(prompt.contains("warming up"));
        assert!(prompt.contains("Task: say hi"));
    }
}
