//! 脚本回放 Provider（测试用）
//!
//! 字段回答与确认各自一个队列，按序弹出；字段队列耗尽视为取消，
//! 确认队列耗尽默认回答 No（让循环自然走到迭代上限）。

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::catalog::PropertySchema;
use crate::interact::{Confirmation, FieldAnswer, InteractionProvider};

#[derive(Default)]
pub struct ScriptedProvider {
    answers: Mutex<VecDeque<FieldAnswer>>,
    confirmations: Mutex<VecDeque<Confirmation>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预设字段回答（按请求顺序消费）
    pub fn with_answers(self, answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        {
            let mut queue = self.answers.try_lock().expect("unshared at build time");
            queue.extend(answers.into_iter().map(|a| FieldAnswer::Value(a.into())));
        }
        self
    }

    pub fn with_cancel_on_field(self) -> Self {
        self.answers
            .try_lock()
            .expect("unshared at build time")
            .push_back(FieldAnswer::Cancelled);
        self
    }

    pub fn with_confirmations(self, confirmations: impl IntoIterator<Item = Confirmation>) -> Self {
        self.confirmations
            .try_lock()
            .expect("unshared at build time")
            .extend(confirmations);
        self
    }
}

#[async_trait]
impl InteractionProvider for ScriptedProvider {
    async fn resolve_field(
        &self,
        _tool: &str,
        _field: &str,
        _schema: Option<&PropertySchema>,
        _required: bool,
    ) -> FieldAnswer {
        self.answers
            .lock()
            .await
            .pop_front()
            .unwrap_or(FieldAnswer::Cancelled)
    }

    async fn confirm(&self, _prompt: &str) -> Confirmation {
        self.confirmations
            .lock()
            .await
            .pop_front()
            .unwrap_or(Confirmation::No)
    }
}
