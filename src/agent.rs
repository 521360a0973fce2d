//! Agent Handle：一个演员（或 chat 会话）独占的 LLM 连接与私有记忆
//!
//! create_llm_from_config 按配置选择后端；AgentHandle::invoke 把历史 + 新输入交给 LLM，
//! 成功后把这一轮写入自己的记忆（链式对话）；AgentFactory 为每个演员各建一个 Handle，绝不共享。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{load_config, AppConfig};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{ConversationMemory, Message};
use crate::script::ActorSpec;

/// 远端调用失败（网络、鉴权、超时等），不重试
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invocation rejected: {0}")]
pub struct InvocationError(pub String);

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);

    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient);
    }

    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        let base = cfg.llm.base_url.as_deref();
        tracing::debug!("Using OpenAI LLM ({})", model);
        Arc::new(
            OpenAiClient::new(base, &model, std::env::var("OPENAI_API_KEY").ok().as_deref())
                .with_temperature(cfg.llm.temperature)
                .with_timeout(timeout),
        )
    } else if use_deepseek {
        let model = cfg.llm.deepseek.model.clone();
        tracing::debug!("Using DeepSeek LLM ({:?})", model);
        Arc::new(create_deepseek_client(
            model.as_deref(),
            cfg.llm.temperature,
            timeout,
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// 单个 Agent 的句柄：LLM 连接 + 私有对话记忆
pub struct AgentHandle {
    llm: Arc<dyn LlmClient>,
    memory: ConversationMemory,
}

impl AgentHandle {
    pub fn new(llm: Arc<dyn LlmClient>, max_turns: usize) -> Self {
        Self {
            llm,
            memory: ConversationMemory::new(max_turns),
        }
    }

    /// 调用远端：输入 history + user(input)，成功后写入记忆；失败时记忆保持不变
    pub async fn invoke(&mut self, input: &str) -> Result<String, InvocationError> {
        let mut messages = Vec::with_capacity(self.memory.len() + 1);
        messages.extend_from_slice(self.memory.messages());
        messages.push(Message::user(input));

        let reply = self.llm.complete(&messages).await.map_err(InvocationError)?;
        self.memory.push_exchange(input, reply.clone());
        Ok(reply)
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("memory_len", &self.memory.len())
            .finish()
    }
}

/// 为每个演员创建独立 Handle 的工厂
pub trait AgentFactory: Send + Sync {
    fn create(&self, spec: &ActorSpec) -> AgentHandle;
}

impl<F> AgentFactory for F
where
    F: Fn(&ActorSpec) -> AgentHandle + Send + Sync,
{
    fn create(&self, spec: &ActorSpec) -> AgentHandle {
        self(spec)
    }
}

/// 按配置为每个演员新建一个 LLM 客户端
pub struct LlmAgentFactory {
    config: AppConfig,
}

impl LlmAgentFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl AgentFactory for LlmAgentFactory {
    fn create(&self, spec: &ActorSpec) -> AgentHandle {
        tracing::debug!(actor = %spec.name, "Creating agent handle");
        AgentHandle::new(
            create_llm_from_config(&self.config),
            self.config.app.max_context_turns,
        )
    }
}

/// 便捷函数：加载配置（可追加一个显式文件），失败时退回默认值
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Role;

    #[tokio::test]
    async fn test_invoke_chains_memory() {
        let llm = Arc::new(ScriptedLlmClient::new(["first", "second"]));
        let mut handle = AgentHandle::new(llm.clone(), 10);

        assert_eq!(handle.invoke("hello").await.unwrap(), "first");
        assert_eq!(handle.invoke("again").await.unwrap(), "second");

        let history = handle.memory().messages();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].role, Role::User);
        assert_eq!(history[2].content, "again");
        assert_eq!(llm.prompts(), vec!["hello", "again"]);
    }

    #[tokio::test]
    async fn test_failed_invoke_leaves_memory_untouched() {
        let llm = Arc::new(ScriptedLlmClient::new(["ok"]).then_fail("503"));
        let mut handle = AgentHandle::new(llm, 10);

        handle.invoke("one").await.unwrap();
        let err = handle.invoke("two").await.unwrap_err();
        assert_eq!(err, InvocationError("503".to_string()));
        assert_eq!(handle.memory().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_replies_are_remembered() {
        let llm = Arc::new(MockLlmClient);
        let mut handle = AgentHandle::new(llm, 10);

        let reply = handle.invoke("ping").await.unwrap();
        assert_eq!(reply, "Echo from Mock: ping");
        assert_eq!(handle.memory().messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_mock_provider_from_config() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        assert_eq!(create_llm_from_config(&cfg).token_usage(), (0, 0, 0));
    }
}
