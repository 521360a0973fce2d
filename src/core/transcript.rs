//! 对话记录：每次调用产生一条 TranscriptEntry，按调用顺序交给注入的 TranscriptSink
//!
//! SelfChatContext 代替进程级全局状态，显式传入编排器与阶段执行器。

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::SelfChatError;

/// 产生该条记录的执行步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "round")]
pub enum Step {
    Priming,
    Kickstart,
    /// 第 n 轮（从 1 开始）
    Round(u32),
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub phase: String,
    pub step: Step,
    pub actor: String,
    pub input: String,
    pub reply: String,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(
        phase: impl Into<String>,
        step: Step,
        actor: impl Into<String>,
        input: impl Into<String>,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            phase: phase.into(),
            step,
            actor: actor.into(),
            input: input.into(),
            reply: reply.into(),
            at: Utc::now(),
        }
    }
}

/// 对话记录输出端；写入失败会中止整次运行
pub trait TranscriptSink: Send + Sync {
    fn phase_started(&self, _phase: &str) -> io::Result<()> {
        Ok(())
    }

    fn record(&self, entry: &TranscriptEntry) -> io::Result<()>;
}

/// 打印到标准输出；verbose 时同时打印调用输入
#[derive(Debug, Default)]
pub struct StdoutTranscript {
    verbose: bool,
}

impl StdoutTranscript {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TranscriptSink for StdoutTranscript {
    fn phase_started(&self, phase: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "=== {} ===", phase)
    }

    fn record(&self, entry: &TranscriptEntry) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if self.verbose {
            writeln!(out, "[{:?}] {} <- {}", entry.step, entry.actor, entry.input)?;
        }
        writeln!(out, "{}: {}", entry.actor, entry.reply)?;
        writeln!(out)
    }
}

/// 收集到内存（测试与汇总用）
#[derive(Debug, Default)]
pub struct MemoryTranscript {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TranscriptSink for MemoryTranscript {
    fn record(&self, entry: &TranscriptEntry) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(())
    }
}

/// 一次 selfchat 运行的上下文：运行 ID 与对话记录输出端
#[derive(Clone)]
pub struct SelfChatContext {
    pub run_id: Uuid,
    transcript: Arc<dyn TranscriptSink>,
}

impl SelfChatContext {
    pub fn new(transcript: Arc<dyn TranscriptSink>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            transcript,
        }
    }

    /// 标准输出记录，verbose 由配置或 --debug 决定
    pub fn stdout(verbose: bool) -> Self {
        Self::new(Arc::new(StdoutTranscript::new(verbose)))
    }

    pub fn phase_started(&self, phase: &str) -> Result<(), SelfChatError> {
        self.transcript.phase_started(phase)?;
        Ok(())
    }

    pub fn emit(&self, entry: TranscriptEntry) -> Result<(), SelfChatError> {
        tracing::debug!(
            phase = %entry.phase,
            actor = %entry.actor,
            step = ?entry.step,
            "Invocation completed"
        );
        self.transcript.record(&entry)?;
        Ok(())
    }
}

impl std::fmt::Debug for SelfChatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfChatContext")
            .field("run_id", &self.run_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transcript_keeps_order() {
        let sink = Arc::new(MemoryTranscript::new());
        let ctx = SelfChatContext::new(sink.clone());
        ctx.emit(TranscriptEntry::new("p", Step::Priming, "A", "hi", "one"))
            .unwrap();
        ctx.emit(TranscriptEntry::new("p", Step::Round(1), "B", "one", "two"))
            .unwrap();

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].actor, "A");
        assert_eq!(entries[1].step, Step::Round(1));
    }

    struct ClosedPipe;

    impl TranscriptSink for ClosedPipe {
        fn record(&self, _entry: &TranscriptEntry) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_sink_write_error_surfaces() {
        let ctx = SelfChatContext::new(Arc::new(ClosedPipe));
        assert!(ctx.phase_started("p").is_ok());
        let err = ctx
            .emit(TranscriptEntry::new("p", Step::Priming, "A", "hi", "one"))
            .unwrap_err();
        assert!(matches!(
            err,
            SelfChatError::Transcript(ref e) if e.kind() == io::ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn test_entry_serializes_step() {
        let entry = TranscriptEntry::new("p", Step::Round(2), "A", "in", "out");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["step"]["kind"], "round");
        assert_eq!(json["step"]["round"], 2);
        assert_eq!(json["reply"], "out");
    }
}
