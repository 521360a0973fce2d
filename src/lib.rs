//! chatrunner - 驱动多个 LLM Agent 按剧本对话
//!
//! 模块划分：
//! - **agent**: Agent Handle（独占 LLM 连接 + 私有记忆）与演员工厂
//! - **cli / commands**: 命令行定义与 respond / chat / selfchat 实现
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 演员注册表、kickstart 解析、停止条件、阶段执行器、对话编排器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 每个 Agent 的短期对话历史
//! - **script**: selfchat 剧本的数据模型与加载

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod script;

pub use crate::core::{run_conversation, ConversationOrchestrator, SelfChatContext, SelfChatError};
pub use script::{load_script, Conversation};
