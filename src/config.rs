//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WASP__*` 覆盖（双下划线表示嵌套，
//! 如 `WASP__LLM__MODEL=gpt-4o`）。API 密钥只从环境变量读取，不落配置文件。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub proxy: ProxySection,
}

/// [llm] 段：OpenAI 兼容端点与模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 端点 base_url，未设置时用 async-openai 默认（api.openai.com）
    pub base_url: Option<String>,
    pub model: String,
    /// 单次补全的 token 上限
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

/// [agent] 段：循环迭代上限与重试预算
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// ReAct 迭代上限，达到后按未完成上报
    pub max_iterations: usize,
    /// 参数收集的整体重试上限（整段收集为一次，非单字段）
    pub resolver_max_retries: u32,
    /// 工具执行总尝试数上限（参数重试与传输重试共用一个计数器）
    pub executor_max_attempts: u32,
    /// 传输失败后的固定退避秒数
    pub backoff_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            resolver_max_retries: 3,
            executor_max_attempts: 3,
            backoff_secs: 1,
        }
    }
}

/// [transport] 段：工具进程的启动命令（stdio JSON-RPC 对端）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            command: "wasp-proxy".to_string(),
            args: Vec::new(),
        }
    }
}

/// [proxy] 段：上游后端与工具目录存储
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    /// GitHub MCP 上游端点
    pub upstream_url: String,
    /// 工具目录存储文件；启动时不可读为致命错误
    pub catalog_path: PathBuf,
    /// 读取 Bearer 凭证的环境变量名（可缺省，运行期可经 github_token 工具注入）
    pub token_env: String,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            upstream_url: "https://api.githubcopilot.com/mcp/".to_string(),
            catalog_path: PathBuf::from("config/tools.json"),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            agent: AgentSection::default(),
            transport: TransportSection::default(),
            proxy: ProxySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 WASP__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WASP__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WASP")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_iterations, 10);
        assert_eq!(cfg.agent.executor_max_attempts, 3);
        assert_eq!(cfg.agent.backoff_secs, 1);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.max_tokens, 256);
        assert!(cfg.llm.base_url.is_none());
        assert_eq!(cfg.transport.command, "wasp-proxy");
        assert!(cfg.proxy.upstream_url.starts_with("https://"));
    }

    #[test]
    fn test_absent_llm_section_keeps_model_defaults() {
        // [llm] 整段缺失时走 Default 路径，不得退化为空 model / 0 token
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[agent]\nmax_iterations = 5",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.agent.max_iterations, 5);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.max_tokens, 256);
    }
}
