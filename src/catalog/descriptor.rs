//! 工具描述符（tools/list 的线上形态）
//!
//! 取回后不可变；required/optional 的划分供参数收集与 prompt 渲染使用。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 单个工具：名称、描述、分类与输入 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: InputSchema,
}

/// 输入 schema：properties 按字段名排序，required 为字段名集合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_object")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_object() -> String {
    "object".to_string()
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            kind: default_object(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// 单个字段：类型、描述与可选的枚举约束
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ToolDescriptor {
    pub fn is_required(&self, field: &str) -> bool {
        self.input_schema.required.iter().any(|f| f == field)
    }

    /// required 字段名（按 schema 声明顺序）
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema.required.iter().map(String::as_str).collect()
    }

    /// optional 字段名（properties 中不在 required 集合里的）
    pub fn optional_fields(&self) -> Vec<&str> {
        self.input_schema
            .properties
            .keys()
            .filter(|k| !self.is_required(k))
            .map(String::as_str)
            .collect()
    }

    pub fn property(&self, field: &str) -> Option<&PropertySchema> {
        self.input_schema.properties.get(field)
    }
}
