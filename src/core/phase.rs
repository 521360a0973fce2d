//! 阶段执行器：Priming → (Kickstart) → RoundExchange → Done
//!
//! - Priming：按阶段顺序用各自的固定 prompt 调用每个演员
//! - Kickstart：解析表达式后只调用阶段的第一个演员
//! - RoundExchange：最多 numRounds 轮，每轮遍历配对 (k, (k+1) mod len)，
//!   当前演员以前一演员的 last_response 为输入；回复命中 stop phrase 时整个阶段的轮转立即结束
//!
//! 所有调用严格串行，注册表的修改跨阶段保留。

use serde::Serialize;

use crate::core::{
    resolve_kickstart, should_stop, ActorRegistry, SelfChatContext, SelfChatError, Step,
    TranscriptEntry,
};
use crate::script::Phase;

/// 单轮遍历的结果：Stopped 会被上一层消费并结束整个轮转
#[derive(Debug, Clone, PartialEq, Eq)]
enum PassOutcome {
    Completed,
    Stopped { actor: String },
}

/// 阶段执行摘要
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseReport {
    pub name: String,
    /// 本阶段的远端调用次数（priming + kickstart + 轮转）
    pub invocations: usize,
    /// 完整走完的轮数
    pub rounds_completed: u32,
    /// 触发 stop phrase 的演员
    pub stopped_by: Option<String>,
}

pub struct PhaseExecutor<'a> {
    phase: &'a Phase,
    ctx: &'a SelfChatContext,
}

impl<'a> PhaseExecutor<'a> {
    pub fn new(phase: &'a Phase, ctx: &'a SelfChatContext) -> Self {
        Self { phase, ctx }
    }

    pub async fn run(&self, registry: &mut ActorRegistry) -> Result<PhaseReport, SelfChatError> {
        let mut report = PhaseReport {
            name: self.phase.name.clone(),
            ..PhaseReport::default()
        };
        self.ctx.phase_started(&self.phase.name)?;

        self.prime(registry, &mut report).await?;

        if let Some(expression) = &self.phase.kickstart {
            self.kickstart(expression, registry, &mut report).await?;
        }

        self.exchange(registry, &mut report).await?;

        tracing::info!(
            phase = %report.name,
            invocations = report.invocations,
            rounds = report.rounds_completed,
            stopped_by = ?report.stopped_by,
            "Phase done"
        );
        Ok(report)
    }

    /// 调用一个演员并记录回复；演员未注册时返回 Ok(None)
    async fn invoke(
        &self,
        registry: &mut ActorRegistry,
        actor: &str,
        input: &str,
        step: Step,
        report: &mut PhaseReport,
    ) -> Result<Option<String>, SelfChatError> {
        let Some(record) = registry.get_mut(actor) else {
            return Ok(None);
        };

        let reply = record
            .handle_mut()
            .invoke(input)
            .await
            .map_err(|source| SelfChatError::Invocation {
                actor: actor.to_string(),
                source,
            })?;
        report.invocations += 1;

        registry.record_response(actor, reply.clone());
        self.ctx.emit(TranscriptEntry::new(
            &self.phase.name,
            step,
            actor,
            input,
            reply.clone(),
        ))?;
        Ok(Some(reply))
    }

    async fn prime(
        &self,
        registry: &mut ActorRegistry,
        report: &mut PhaseReport,
    ) -> Result<(), SelfChatError> {
        for actor in &self.phase.actors {
            let Some(prompt) = registry.get(actor).map(|r| r.spec().prompt.clone()) else {
                tracing::debug!(phase = %self.phase.name, actor = %actor, "Skipping priming of unregistered actor");
                continue;
            };
            self.invoke(registry, actor, &prompt, Step::Priming, report)
                .await?;
        }
        Ok(())
    }

    async fn kickstart(
        &self,
        expression: &str,
        registry: &mut ActorRegistry,
        report: &mut PhaseReport,
    ) -> Result<(), SelfChatError> {
        let prompt = resolve_kickstart(expression, registry)?;
        let first = self
            .phase
            .actors
            .first()
            .ok_or_else(|| SelfChatError::UnknownActor {
                phase: self.phase.name.clone(),
                actor: String::new(),
            })?;

        match self
            .invoke(registry, first, &prompt, Step::Kickstart, report)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(SelfChatError::UnknownActor {
                phase: self.phase.name.clone(),
                actor: first.clone(),
            }),
        }
    }

    async fn exchange(
        &self,
        registry: &mut ActorRegistry,
        report: &mut PhaseReport,
    ) -> Result<(), SelfChatError> {
        for round in 1..=self.phase.ends.num_rounds {
            match self.pass(round, registry, report).await? {
                PassOutcome::Completed => report.rounds_completed = round,
                PassOutcome::Stopped { actor } => {
                    tracing::info!(
                        phase = %self.phase.name,
                        actor = %actor,
                        round,
                        "Stop phrase detected, ending phase"
                    );
                    report.stopped_by = Some(actor);
                    break;
                }
            }
        }
        Ok(())
    }

    /// 一轮：遍历全部相邻配对（含末尾回绕到第一个演员）
    async fn pass(
        &self,
        round: u32,
        registry: &mut ActorRegistry,
        report: &mut PhaseReport,
    ) -> Result<PassOutcome, SelfChatError> {
        let actors = &self.phase.actors;
        let len = actors.len();

        for k in 0..len {
            let previous = &actors[k];
            let current = &actors[(k + 1) % len];

            if !registry.contains(current) {
                tracing::debug!(phase = %self.phase.name, actor = %current, "Skipping pair with unregistered actor");
                continue;
            }
            let Some(input) = registry.last_response(previous).map(str::to_string) else {
                tracing::debug!(phase = %self.phase.name, actor = %previous, "Skipping pair without a previous response");
                continue;
            };

            let Some(reply) = self
                .invoke(registry, current, &input, Step::Round(round), report)
                .await?
            else {
                continue;
            };

            if should_stop(&reply, &self.phase.ends.stop_phrase) {
                return Ok(PassOutcome::Stopped {
                    actor: current.clone(),
                });
            }
        }
        Ok(PassOutcome::Completed)
    }
}
