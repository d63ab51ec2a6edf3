//! Scripted LLM 客户端（测试用，无需 API）
//!
//! 按入队顺序回放预设回复，耗尽后报错；便于在本地确定性地跑通整个 ReAct 流程。

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::{LlmClient, Message};

/// 回放式客户端：每次 complete 弹出一条预设回复
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| "scripted replies exhausted".to_string())
    }
}
