//! 剧本（selfchat script）：演员列表 + 有序阶段
//!
//! 剧本文件按名字查找，扩展名自动补全（.yaml / .yml / .toml / .json），由 config crate 解析后反序列化。

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 剧本加载错误
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to load script: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid script: {0}")]
    Invalid(String),
}

/// 演员定义：名字在一次对话内唯一；prompt 为开场（priming）提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpec {
    pub name: String,
    pub prompt: String,
    /// 演员级种子消息；阶段执行只使用阶段级 kickstart
    #[serde(default)]
    pub kickstart: Option<String>,
}

/// 阶段结束条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ends {
    #[serde(
        rename = "stopPhrase",
        alias = "stopphrase",
        alias = "stop_phrase",
        default
    )]
    pub stop_phrase: String,
    #[serde(rename = "numRounds", alias = "numrounds", alias = "num_rounds")]
    pub num_rounds: u32,
}

/// 一个阶段：actors 的顺序即轮转顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub actors: Vec<String>,
    #[serde(default)]
    pub kickstart: Option<String>,
    pub ends: Ends,
}

/// 一次 selfchat 运行的完整剧本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub actors: Vec<ActorSpec>,
    pub conversation: Vec<Phase>,
}

impl Conversation {
    /// 检查结构问题：空阶段为错误；引用未声明的演员只告警（轮转时会被跳过）
    ///
    /// 演员重名不在这里判断，由 ActorRegistry 注册时报 DuplicateActor。
    pub fn validate(&self) -> Result<(), ScriptError> {
        let known: HashSet<&str> = self.actors.iter().map(|a| a.name.as_str()).collect();

        for phase in &self.conversation {
            if phase.actors.is_empty() {
                return Err(ScriptError::Invalid(format!(
                    "phase '{}' has no actors",
                    phase.name
                )));
            }
            for name in &phase.actors {
                if !known.contains(name.as_str()) {
                    tracing::warn!(
                        phase = %phase.name,
                        actor = %name,
                        "Phase references an undeclared actor"
                    );
                }
            }
        }
        Ok(())
    }

    /// 用同一个轮数覆盖所有阶段的 numRounds（CLI --num-rounds）
    pub fn override_num_rounds(&mut self, num_rounds: u32) {
        for phase in &mut self.conversation {
            phase.ends.num_rounds = num_rounds;
        }
    }
}

/// 从 `dir/name` 加载剧本（扩展名自动补全），并做结构校验
pub fn load_script(dir: &Path, name: &str) -> Result<Conversation, ScriptError> {
    let base = dir.join(name);
    let base = base
        .to_str()
        .ok_or_else(|| ScriptError::Invalid(format!("non UTF-8 script path: {:?}", base)))?;

    let conversation: Conversation = config::Config::builder()
        .add_source(config::File::with_name(base))
        .build()?
        .try_deserialize()?;

    conversation.validate()?;
    tracing::debug!(
        script = %base,
        actors = conversation.actors.len(),
        phases = conversation.conversation.len(),
        "Script loaded"
    );
    Ok(conversation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBATE_YAML: &str = r#"
actors:
  - name: Alice
    prompt: "You are Alice. Argue for tabs."
  - name: Bob
    prompt: "You are Bob. Argue for spaces."
    kickstart: "Tabs are wrong."
conversation:
  - name: opening
    actors: [Alice, Bob]
    kickstart: "Make your opening statement."
    ends:
      stopPhrase: "I concede"
      numRounds: 3
  - name: closing
    actors: [Bob, Alice]
    kickstart: "Alice.lastResponse"
    ends:
      stopPhrase: ""
      numRounds: 1
"#;

    #[test]
    fn test_load_yaml_with_extension_appended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("debate.yaml"), DEBATE_YAML).unwrap();

        let script = load_script(dir.path(), "debate").unwrap();
        assert_eq!(script.actors.len(), 2);
        assert_eq!(script.actors[1].kickstart.as_deref(), Some("Tabs are wrong."));
        assert_eq!(script.conversation[0].ends.stop_phrase, "I concede");
        assert_eq!(script.conversation[0].ends.num_rounds, 3);
        assert_eq!(
            script.conversation[1].kickstart.as_deref(),
            Some("Alice.lastResponse")
        );
        assert_eq!(script.conversation[1].actors, vec!["Bob", "Alice"]);
    }

    #[test]
    fn test_load_toml_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pair.toml"),
            r#"
[[actors]]
name = "A"
prompt = "Hi, I am A"

[[actors]]
name = "B"
prompt = "Hi, I am B"

[[conversation]]
name = "only"
actors = ["A", "B"]

[conversation.ends]
stopPhrase = "BYE"
numRounds = 2
"#,
        )
        .unwrap();

        let script = load_script(dir.path(), "pair").unwrap();
        assert_eq!(script.conversation.len(), 1);
        assert_eq!(script.conversation[0].kickstart, None);
        assert_eq!(script.conversation[0].ends.num_rounds, 2);
    }

    #[test]
    fn test_missing_script_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(dir.path(), "nope").unwrap_err();
        assert!(matches!(err, ScriptError::Load(_)));
    }

    #[test]
    fn test_empty_phase_is_invalid() {
        let script = Conversation {
            actors: vec![],
            conversation: vec![Phase {
                name: "empty".into(),
                actors: vec![],
                kickstart: None,
                ends: Ends {
                    stop_phrase: String::new(),
                    num_rounds: 1,
                },
            }],
        };
        assert!(matches!(script.validate(), Err(ScriptError::Invalid(_))));
    }

    #[test]
    fn test_override_num_rounds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("debate.yml"), DEBATE_YAML).unwrap();
        let mut script = load_script(dir.path(), "debate").unwrap();
        script.override_num_rounds(7);
        assert!(script.conversation.iter().all(|p| p.ends.num_rounds == 7));
    }
}
