//! 控制台 Provider：从 stdin 逐行读取回答
//!
//! EOF（Ctrl+D）视为取消。提示写到 stdout；代理侧不会用到本实现，
//! stdout 被协议占用的是代理进程而非客户端进程。

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::catalog::PropertySchema;
use crate::interact::{Confirmation, FieldAnswer, InteractionProvider};

pub struct ConsoleProvider {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleProvider {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// 读一行；EOF 或读错误返回 None
    async fn read_line(&self) -> Option<String> {
        self.lines.lock().await.next_line().await.ok().flatten()
    }
}

impl Default for ConsoleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionProvider for ConsoleProvider {
    async fn resolve_field(
        &self,
        tool: &str,
        field: &str,
        schema: Option<&PropertySchema>,
        required: bool,
    ) -> FieldAnswer {
        let mut hint = String::new();
        if let Some(s) = schema {
            if let Some(values) = &s.enum_values {
                hint = format!(" ({})", values.join("|"));
            } else if !s.kind.is_empty() {
                hint = format!(" ({})", s.kind);
            }
        }
        let tag = if required { "required" } else { "optional, Enter to skip" };
        println!("[{}] {}{} [{}]:", tool, field, hint, tag);

        match self.read_line().await {
            Some(line) => FieldAnswer::Value(line.trim().to_string()),
            None => FieldAnswer::Cancelled,
        }
    }

    async fn confirm(&self, prompt: &str) -> Confirmation {
        println!("{} [y/N]:", prompt);
        match self.read_line().await {
            Some(line) => {
                let answer = line.trim().to_lowercase();
                if answer == "y" || answer == "yes" {
                    Confirmation::Yes
                } else {
                    Confirmation::No
                }
            }
            None => Confirmation::Cancelled,
        }
    }
}
