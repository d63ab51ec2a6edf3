//! 工具目录存储
//!
//! 外部 JSON 文件以工具名为键：{description, category, parameters: [{key, type,
//! description, required, values}]}，加载时转为线上形态的 ToolDescriptor。
//! 代理启动时存储不可达或格式损坏为致命错误。

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::descriptor::{InputSchema, PropertySchema, ToolDescriptor};
use crate::core::AgentError;

/// 存储里的单条记录
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub parameters: Vec<CatalogParam>,
}

/// 记录里的单个参数
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogParam {
    pub key: String,
    #[serde(rename = "type", default = "default_string")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// 取值白名单，转为 schema 的 enum 约束
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

fn default_string() -> String {
    "string".to_string()
}

/// 已加载的目录：按工具名查找，保序输出描述符
#[derive(Debug)]
pub struct CatalogStore {
    tools: Vec<ToolDescriptor>,
}

impl CatalogStore {
    /// 从 JSON 文件加载目录；任何失败都应让代理启动失败
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("catalog store {}: {}", path.display(), e))
        })?;
        let records: BTreeMap<String, CatalogRecord> = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Config(format!("catalog store {}: {}", path.display(), e)))?;

        let tools = records
            .into_iter()
            .map(|(name, record)| descriptor_from_record(name, record))
            .collect();
        Ok(Self { tools })
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn descriptor_from_record(name: String, record: CatalogRecord) -> ToolDescriptor {
    let mut properties = BTreeMap::new();
    let mut required = Vec::new();

    for param in record.parameters {
        if param.required {
            required.push(param.key.clone());
        }
        properties.insert(
            param.key,
            PropertySchema {
                kind: param.kind,
                description: param.description,
                enum_values: param.values,
            },
        );
    }

    ToolDescriptor {
        name,
        description: record.description,
        category: record.category,
        input_schema: InputSchema {
            kind: "object".to_string(),
            properties,
            required,
        },
    }
}
