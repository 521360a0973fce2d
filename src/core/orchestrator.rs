//! 对话编排器：按剧本顺序执行各阶段，所有阶段共享同一个演员注册表
//!
//! 注册表在第一个阶段前由剧本的演员列表一次性建立；阶段之间不重置 last_response，
//! 也不回滚：中途失败时注册表保持失败那一刻的状态。

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::AgentFactory;
use crate::core::{ActorRegistry, PhaseExecutor, PhaseReport, SelfChatContext, SelfChatError};
use crate::script::Conversation;

/// 整次运行的摘要
#[derive(Debug, Clone, Serialize)]
pub struct ConversationReport {
    pub run_id: Uuid,
    pub phases: Vec<PhaseReport>,
    /// 运行结束时每个演员的 last_response（从未回复的演员不出现）
    pub last_responses: BTreeMap<String, String>,
}

impl ConversationReport {
    pub fn total_invocations(&self) -> usize {
        self.phases.iter().map(|p| p.invocations).sum()
    }
}

/// 持有剧本与注册表；run 消费自身，一个编排器只能执行一次
pub struct ConversationOrchestrator {
    conversation: Conversation,
    registry: ActorRegistry,
    ctx: SelfChatContext,
}

impl ConversationOrchestrator {
    /// 由剧本演员建立注册表；演员重名时直接失败，不执行任何阶段
    pub fn new(
        conversation: Conversation,
        factory: &dyn AgentFactory,
        ctx: SelfChatContext,
    ) -> Result<Self, SelfChatError> {
        let registry = ActorRegistry::from_specs(&conversation.actors, factory)?;
        Ok(Self {
            conversation,
            registry,
            ctx,
        })
    }

    pub async fn run(self) -> Result<ConversationReport, SelfChatError> {
        let Self {
            conversation,
            mut registry,
            ctx,
        } = self;
        let span = tracing::info_span!("selfchat", run_id = %ctx.run_id);
        async {
            tracing::info!(
                actors = registry.len(),
                phases = conversation.conversation.len(),
                "Conversation started"
            );

            let mut phases = Vec::with_capacity(conversation.conversation.len());
            for phase in &conversation.conversation {
                tracing::info!(phase = %phase.name, actors = ?phase.actors, "Phase started");
                let report = PhaseExecutor::new(phase, &ctx).run(&mut registry).await?;
                phases.push(report);
            }

            let report = ConversationReport {
                run_id: ctx.run_id,
                phases,
                last_responses: registry.last_responses(),
            };
            tracing::info!(
                invocations = report.total_invocations(),
                "Conversation finished"
            );
            Ok::<_, SelfChatError>(report)
        }
        .instrument(span)
        .await
    }
}

/// 便捷函数：建立注册表并执行完整剧本
pub async fn run_conversation(
    conversation: Conversation,
    factory: &dyn AgentFactory,
    ctx: SelfChatContext,
) -> Result<ConversationReport, SelfChatError> {
    ConversationOrchestrator::new(conversation, factory, ctx)?
        .run()
        .await
}
