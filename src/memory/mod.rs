//! 记忆层：每个 Agent Handle 私有的短期对话历史

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
