//! 演员注册表：演员名 -> 会话记录（Handle + 定义 + 最近一次回复）
//!
//! 整个 selfchat 运行期间只有一份，由编排器持有并逐阶段传入；last_response 只保留最新一条。

use std::collections::{BTreeMap, HashMap};

use crate::agent::{AgentFactory, AgentHandle};
use crate::core::SelfChatError;
use crate::script::ActorSpec;

/// 单个演员的会话记录
#[derive(Debug)]
pub struct SessionRecord {
    handle: AgentHandle,
    spec: ActorSpec,
    last_response: Option<String>,
}

impl SessionRecord {
    pub fn new(spec: ActorSpec, handle: AgentHandle) -> Self {
        Self {
            handle,
            spec,
            last_response: None,
        }
    }

    pub fn spec(&self) -> &ActorSpec {
        &self.spec
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn handle_mut(&mut self) -> &mut AgentHandle {
        &mut self.handle
    }
}

#[derive(Debug, Default)]
pub struct ActorRegistry {
    sessions: HashMap<String, SessionRecord>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次注册剧本里的全部演员；遇到重名立即失败
    pub fn from_specs<'a, I>(specs: I, factory: &dyn AgentFactory) -> Result<Self, SelfChatError>
    where
        I: IntoIterator<Item = &'a ActorSpec>,
    {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec.clone(), factory)?;
        }
        Ok(registry)
    }

    /// 为 spec 新建一个独占的 Handle 并登记
    pub fn register(
        &mut self,
        spec: ActorSpec,
        factory: &dyn AgentFactory,
    ) -> Result<&SessionRecord, SelfChatError> {
        if self.sessions.contains_key(&spec.name) {
            return Err(SelfChatError::DuplicateActor(spec.name));
        }
        let handle = factory.create(&spec);
        let name = spec.name.clone();
        let record = self
            .sessions
            .entry(name)
            .or_insert_with(|| SessionRecord::new(spec, handle));
        Ok(record)
    }

    pub fn get(&self, name: &str) -> Option<&SessionRecord> {
        self.sessions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    /// 覆盖该演员的 last_response；演员不存在时返回 false
    pub fn record_response(&mut self, name: &str, text: impl Into<String>) -> bool {
        match self.sessions.get_mut(name) {
            Some(record) => {
                record.last_response = Some(text.into());
                true
            }
            None => false,
        }
    }

    pub fn last_response(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SessionRecord::last_response)
    }

    /// 所有已回复过的演员及其最新回复，按名字排序
    pub fn last_responses(&self) -> BTreeMap<String, String> {
        self.sessions
            .iter()
            .filter_map(|(name, record)| {
                record
                    .last_response()
                    .map(|text| (name.clone(), text.to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::MockLlmClient;

    fn spec(name: &str) -> ActorSpec {
        ActorSpec {
            name: name.to_string(),
            prompt: format!("Hi, I am {}", name),
            kickstart: None,
        }
    }

    fn factory(_: &ActorSpec) -> AgentHandle {
        AgentHandle::new(Arc::new(MockLlmClient), 4)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ActorRegistry::new();
        let record = registry.register(spec("A"), &factory).unwrap();
        assert_eq!(record.spec().prompt, "Hi, I am A");
        assert_eq!(record.last_response(), None);
        assert!(registry.get("A").is_some());
        assert!(registry.get("Z").is_none());
    }

    #[test]
    fn test_duplicate_actor_rejected() {
        let err = ActorRegistry::from_specs(&[spec("A"), spec("B"), spec("A")], &factory)
            .unwrap_err();
        assert!(matches!(err, SelfChatError::DuplicateActor(name) if name == "A"));
    }

    #[test]
    fn test_record_response_overwrites() {
        let mut registry = ActorRegistry::from_specs(&[spec("A")], &factory).unwrap();
        assert!(registry.record_response("A", "first"));
        assert!(registry.record_response("A", "second"));
        assert!(registry.record_response("A", "second"));
        assert_eq!(registry.last_response("A"), Some("second"));
        assert!(!registry.record_response("missing", "x"));
    }

    #[test]
    fn test_last_responses_skips_silent_actors() {
        let mut registry =
            ActorRegistry::from_specs(&[spec("B"), spec("A"), spec("C")], &factory).unwrap();
        registry.record_response("C", "c0");
        registry.record_response("A", "a0");

        let snapshot: Vec<(String, String)> = registry.last_responses().into_iter().collect();
        assert_eq!(
            snapshot,
            vec![
                ("A".to_string(), "a0".to_string()),
                ("C".to_string(), "c0".to_string())
            ]
        );
    }

    #[test]
    fn test_one_handle_per_actor() {
        let created = std::sync::atomic::AtomicUsize::new(0);
        let counting = |_: &ActorSpec| {
            created.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            AgentHandle::new(Arc::new(MockLlmClient), 4)
        };
        let registry = ActorRegistry::from_specs(&[spec("A"), spec("B")], &counting).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(created.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
