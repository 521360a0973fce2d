//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! - MockLlmClient：回显最后一条 User 消息
//! - ScriptedLlmClient：按调用顺序弹出预设回复，并记录每次收到的输入，便于断言调用顺序

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

fn last_user(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::User))
        .map(|m| m.content.as_str())
}

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        Ok(format!(
            "Echo from Mock: {}",
            last_user(messages).unwrap_or("(no input)")
        ))
    }
}

/// 剧本化 Mock：回复队列按调用顺序消费；队列耗尽时返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 追加一次失败（模拟远端拒绝调用）
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(message.into()));
        self
    }

    /// 已收到的输入（每次调用的最后一条 User 消息），按调用顺序
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(last_user(messages).unwrap_or_default().to_string());

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err("scripted replies exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let client = MockLlmClient;
        let reply = client
            .complete(&[
                Message::user("earlier"),
                Message::assistant("noted"),
                Message::user("ping"),
            ])
            .await
            .unwrap();
        assert_eq!(reply, "Echo from Mock: ping");
    }

    #[tokio::test]
    async fn test_scripted_pops_in_order_then_fails() {
        let client = ScriptedLlmClient::new(["one", "two"]).then_fail("boom");
        assert_eq!(client.complete(&[Message::user("a")]).await.unwrap(), "one");
        assert_eq!(client.complete(&[Message::user("b")]).await.unwrap(), "two");
        assert_eq!(client.complete(&[Message::user("c")]).await.unwrap_err(), "boom");
        assert!(client.complete(&[Message::user("d")]).await.is_err());
        assert_eq!(client.prompts(), vec!["a", "b", "c", "d"]);
    }
}
