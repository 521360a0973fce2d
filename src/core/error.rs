//! selfchat 错误类型
//!
//! 演员重名、kickstart 引用无法解析、kickstart 目标缺失、远端调用失败、对话记录写入失败均为致命错误；
//! 轮转配对中缺失的演员不是错误（静默跳过，见 PhaseExecutor）。

use thiserror::Error;

use crate::agent::InvocationError;

#[derive(Error, Debug)]
pub enum SelfChatError {
    #[error("Duplicate actor: {0}")]
    DuplicateActor(String),

    #[error("Unresolved kickstart reference '{expression}': {reason}")]
    UnresolvedReference { expression: String, reason: String },

    /// 阶段的第一个演员（kickstart 接收者）未注册
    #[error("Unknown actor '{actor}' in phase '{phase}'")]
    UnknownActor { phase: String, actor: String },

    #[error("Actor '{actor}' invocation failed: {source}")]
    Invocation {
        actor: String,
        #[source]
        source: InvocationError,
    },

    /// 对话记录写不出去（例如下游管道已关闭）
    #[error("Transcript write failed: {0}")]
    Transcript(#[from] std::io::Error),
}
