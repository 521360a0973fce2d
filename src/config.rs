//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 `.env`（dotenvy），再读 TOML 文件，最后用环境变量 `CHATRUNNER__*` 覆盖
//! （双下划线表示嵌套，如 `CHATRUNNER__LLM__PROVIDER=deepseek`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub selfchat: SelfChatSection,
}

/// [app] 段：应用名、剧本目录、每个 Agent 的记忆轮数
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// selfchat 剧本所在目录，未设置时用 ./scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    /// 每个 Agent 保留的对话轮数（短期记忆）
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            scripts_dir: default_scripts_dir(),
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_max_context_turns() -> usize {
    20
}

/// [llm] 段：后端选择、采样温度与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    crate::llm::openai::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    crate::llm::openai::DEFAULT_TEMPERATURE
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [selfchat] 段：剧本对话的输出选项
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SelfChatSection {
    /// 对话记录中同时打印每次调用的输入
    #[serde(default)]
    pub verbose_transcript: bool,
}

/// 从 config 目录加载配置，环境变量 CHATRUNNER__* 可覆盖
///
/// 1. 读取当前目录的 `.env`（若存在），使 OPENAI_API_KEY 等变量可见
/// 2. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 3. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 4. 最后叠加环境变量 CHATRUNNER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to read .env: {}", e);
        }
    }

    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHATRUNNER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
