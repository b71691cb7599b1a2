// Scripted triage backend for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::oracle::TriageBackend;

pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    failing: bool,
}

impl ScriptedBackend {
    /// Answers with `replies` in order, then errors.
    pub fn replying<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            prompts: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    /// Errors on every call.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::replying(std::iter::empty())
        }
    }

    /// User prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TriageBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, user: &str, _max_tokens: u32) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        if self.failing {
            anyhow::bail!("backend unavailable");
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}
