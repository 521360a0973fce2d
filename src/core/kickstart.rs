//! Kickstart 解析：`<actorName>.lastResponse` 引用替换为该演员最近的回复，其他表达式原样使用

use std::sync::OnceLock;

use regex::Regex;

use crate::core::{ActorRegistry, SelfChatError};

static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();

fn reference_re() -> &'static Regex {
    REFERENCE_RE.get_or_init(|| {
        Regex::new(r"^(?P<actor>[^\s.]+)\.lastResponse$").expect("static regex")
    })
}

/// 若表达式是引用语法，返回被引用的演员名
pub fn referenced_actor(expression: &str) -> Option<&str> {
    reference_re()
        .captures(expression)
        .and_then(|c| c.name("actor"))
        .map(|m| m.as_str())
}

/// 解析 kickstart 表达式为实际发送的提示
///
/// 引用未知演员或该演员尚无回复时返回 UnresolvedReference。
pub fn resolve_kickstart(
    expression: &str,
    registry: &ActorRegistry,
) -> Result<String, SelfChatError> {
    let Some(actor) = referenced_actor(expression) else {
        return Ok(expression.to_string());
    };

    let record = registry
        .get(actor)
        .ok_or_else(|| SelfChatError::UnresolvedReference {
            expression: expression.to_string(),
            reason: format!("unknown actor '{}'", actor),
        })?;

    record
        .last_response()
        .map(str::to_string)
        .ok_or_else(|| SelfChatError::UnresolvedReference {
            expression: expression.to_string(),
            reason: format!("actor '{}' has not responded yet", actor),
        })
}
