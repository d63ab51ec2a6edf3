//! 动作解析：从模型自由文本中提取结构化工具调用
//!
//! 识别 `Tool: <name>` 标记行，其后为一个 JSON 对象块（可带 `Parameters:`
//! 标签行或 ```json 围栏），以空行或文本结束为界。块解析失败即整体返回
//! None，绝不返回残缺动作。不校验工具名是否在目录中（派发时再查）。
//! 纯函数，无副作用。

use serde_json::{Map, Value};

const TOOL_MARKER: &str = "tool:";
const PARAMS_LABEL: &str = "parameters:";

/// 解析出的动作：工具名与参数表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAction {
    pub tool_name: String,
    pub parameters: Map<String, Value>,
}

/// 标记行之前的文本（作为 Thought），去空白后非空才返回
pub fn thought_prefix(text: &str) -> Option<&str> {
    let (offset, _) = find_marker(text)?;
    let prefix = text[..offset].trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

/// 提取动作；文本中无标记或 JSON 块不可解析时返回 None
pub fn parse_action(text: &str) -> Option<ParsedAction> {
    let (offset, marker_line) = find_marker(text)?;

    let tool_name = marker_line[TOOL_MARKER.len()..].trim().to_string();
    if tool_name.is_empty() {
        return None;
    }

    let rest = &text[offset + marker_line.len()..];
    let block = collect_block(rest);
    let parameters = parse_object(&block)?;

    Some(ParsedAction {
        tool_name,
        parameters,
    })
}

/// 找到首个标记行：返回 (行起始字节偏移, 行内容)
fn find_marker(text: &str) -> Option<(usize, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        let head = trimmed.get(..TOOL_MARKER.len());
        if head.is_some_and(|h| h.eq_ignore_ascii_case(TOOL_MARKER)) {
            let start = offset + (line.len() - line.trim_start().len());
            return Some((start, line.trim_end_matches(['\n', '\r'])
                .trim_start()));
        }
        offset += line.len();
    }
    None
}

/// 收集标记行之后、首个空行（或文本结束）之前的块，剥掉标签行与围栏
fn collect_block(rest: &str) -> String {
    let mut lines = Vec::new();
    for line in rest.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if lines.is_empty() {
                // 标记行与块之间的前导空行可以容忍
                continue;
            }
            break;
        }
        if trimmed.to_ascii_lowercase() == PARAMS_LABEL
            || trimmed.starts_with("```")
        {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// 从块中切出 `{...}` 并解析；非对象一律视为失败
fn parse_object(block: &str) -> Option<Map<String, Value>> {
    let start = block.find('{')?;
    let end = block.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&block[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marker_and_block() {
        let text = "I should create the issue now.\nTool: create_issue\nParameters:\n{\"owner\": \"acme\", \"repo\": \"site\"}";
        let action = parse_action(text).unwrap();
        assert_eq!(action.tool_name, "create_issue");
        assert_eq!(action.parameters["owner"], "acme");
        assert_eq!(thought_prefix(text), Some("I should create the issue now."));
    }

    #[test]
    fn test_parse_with_json_fence() {
        let text = "Tool: echo\n```json\n{\"message\": \"hi\"}\n```";
        let action = parse_action(text).unwrap();
        assert_eq!(action.tool_name, "echo");
        assert_eq!(action.parameters["message"], "hi");
        assert_eq!(thought_prefix(text), None);
    }

    #[test]
    fn test_block_ends_at_blank_line() {
        let text = "Tool: echo\n{\"message\": \"hi\"}\n\nTrailing commentary ignored.";
        let action = parse_action(text).unwrap();
        assert_eq!(action.parameters.len(), 1);
    }

    #[test]
    fn test_marker_without_parseable_block_is_none() {
        assert!(parse_action("Tool: echo\nnot json at all").is_none());
        assert!(parse_action("Tool: echo\n{\"broken\": ").is_none());
        assert!(parse_action("Tool: echo").is_none());
        // 块是 JSON 但不是对象
        assert!(parse_action("Tool: echo\n[1, 2]").is_none());
    }

    #[test]
    fn test_no_marker_is_none() {
        assert!(parse_action("Just thinking out loud here.").is_none());
        assert!(thought_prefix("Just thinking out loud here.").is_none());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "Tool: echo\n{\"message\": \"hi\"}";
        let first = parse_action(text);
        let second = parse_action(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_marker_case_insensitive() {
        let action = parse_action("TOOL: get_me\n{}").unwrap();
        assert_eq!(action.tool_name, "get_me");
        assert!(action.parameters.is_empty());
    }
}
