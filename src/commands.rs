//! 子命令实现：respond（单次调用）、chat（交互式链式对话）、selfchat（剧本对话）

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::{AgentHandle, LlmAgentFactory};
use crate::config::AppConfig;
use crate::core::{run_conversation, ConversationReport, SelfChatContext};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::script::load_script;

/// chat 模式的退出指令
pub const QUIT_COMMAND: &str = "Q";

/// respond 输出：一组生成结果 + token 统计
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResult {
    pub generations: Vec<Vec<Generation>>,
    pub llm_output: LlmOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmOutput {
    pub token_usage: TokenUsageReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageReport {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// 读取全部输入作为 prompt
pub async fn read_prompt<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> anyhow::Result<String> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .await
        .context("Failed to read prompt from stdin")?;
    tracing::debug!("Prompt: {}", input);
    Ok(input)
}

/// 单次调用，不带记忆
pub async fn respond(llm: &dyn LlmClient, prompt: &str) -> anyhow::Result<LlmResult> {
    let text = llm
        .complete(&[Message::user(prompt)])
        .await
        .map_err(|e| anyhow::anyhow!("LLM invocation failed: {}", e))?;
    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();

    Ok(LlmResult {
        generations: vec![vec![Generation { text }]],
        llm_output: LlmOutput {
            token_usage: TokenUsageReport {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            },
        },
    })
}

/// 交互循环：逐行发送给同一个链式 Agent，输入 `Q` 或 EOF 时退出；返回完成的轮数
pub async fn chat_loop<R, W>(
    handle: &mut AgentHandle,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut turns = 0;

    loop {
        writer.write_all(b"> ").await?;
        writer.flush().await?;

        // 行尾换行（含 CRLF）已去掉；其余内容原样比较和发送
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line == QUIT_COMMAND {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle.invoke(&line).await?;
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        turns += 1;
    }

    tracing::debug!(turns, "Chat session ended");
    Ok(turns)
}

/// 加载剧本并执行，记录输出到标准输出
pub async fn selfchat(
    cfg: &AppConfig,
    file: &str,
    num_rounds: Option<u32>,
    verbose: bool,
) -> anyhow::Result<ConversationReport> {
    let mut conversation = load_script(&cfg.app.scripts_dir, file)
        .with_context(|| format!("Failed to load script '{}'", file))?;
    if let Some(n) = num_rounds {
        conversation.override_num_rounds(n);
    }

    let factory = LlmAgentFactory::new(cfg.clone());
    let ctx = SelfChatContext::stdout(verbose || cfg.selfchat.verbose_transcript);

    let report = run_conversation(conversation, &factory, ctx)
        .await
        .context("Self-chat failed")?;
    Ok(report)
}

/// chat 模式使用的单个 Agent
pub fn chat_agent(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> AgentHandle {
    AgentHandle::new(llm, cfg.app.max_context_turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    #[tokio::test]
    async fn test_respond_wraps_single_generation() {
        let llm = ScriptedLlmClient::new(["42"]);
        let result = respond(&llm, "what is six times seven?").await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["generations"][0][0]["text"], "42");
        assert_eq!(json["llmOutput"]["tokenUsage"]["totalTokens"], 0);
        assert_eq!(llm.prompts(), vec!["what is six times seven?"]);
    }

    #[tokio::test]
    async fn test_respond_propagates_failure() {
        let llm = ScriptedLlmClient::default();
        assert!(respond(&llm, "hi").await.is_err());
    }

    #[tokio::test]
    async fn test_read_prompt_reads_everything() {
        let mut input: &[u8] = b"line one\nline two\n";
        assert_eq!(read_prompt(&mut input).await.unwrap(), "line one\nline two\n");
    }

    #[tokio::test]
    async fn test_chat_loop_stops_on_q() {
        let llm = Arc::new(ScriptedLlmClient::new(["hello!", "fine, thanks"]));
        let mut handle = AgentHandle::new(llm.clone(), 10);
        let input: &[u8] = b"hi\n\nhow are you?\nQ\nnever sent\n";
        let mut output = Vec::new();

        let turns = chat_loop(&mut handle, input, &mut output).await.unwrap();

        assert_eq!(turns, 2);
        assert_eq!(llm.prompts(), vec!["hi", "how are you?"]);
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("hello!\n"));
        assert!(printed.contains("fine, thanks\n"));
        // 链式记忆：第二次调用带着第一轮历史
        assert_eq!(handle.memory().len(), 4);
    }

    #[tokio::test]
    async fn test_chat_loop_quits_only_on_literal_q() {
        let llm = Arc::new(ScriptedLlmClient::new(["not quitting", "bye"]));
        let mut handle = AgentHandle::new(llm.clone(), 10);
        let input: &[u8] = b" Q \r\nq\r\nQ\r\nnever sent\n";
        let mut output = Vec::new();

        let turns = chat_loop(&mut handle, input, &mut output).await.unwrap();

        assert_eq!(turns, 2);
        assert_eq!(llm.prompts(), vec![" Q ", "q"]);
    }

    #[tokio::test]
    async fn test_chat_loop_ends_on_eof() {
        let llm = Arc::new(ScriptedLlmClient::new(["pong"]));
        let mut handle = AgentHandle::new(llm, 10);
        let input: &[u8] = b"ping";
        let mut output = Vec::new();

        assert_eq!(chat_loop(&mut handle, input, &mut output).await.unwrap(), 1);
    }
}
