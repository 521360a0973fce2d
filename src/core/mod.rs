//! 核心编排层：演员注册表、kickstart 解析、停止条件、阶段执行器、对话编排器

pub mod error;
pub mod kickstart;
pub mod orchestrator;
pub mod phase;
pub mod registry;
pub mod stop;
pub mod transcript;

pub use error::SelfChatError;
pub use kickstart::resolve_kickstart;
pub use orchestrator::{run_conversation, ConversationOrchestrator, ConversationReport};
pub use phase::{PhaseExecutor, PhaseReport};
pub use registry::{ActorRegistry, SessionRecord};
pub use stop::should_stop;
pub use transcript::{
    MemoryTranscript, SelfChatContext, Step, StdoutTranscript, TranscriptEntry, TranscriptSink,
};
