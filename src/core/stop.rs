//! 停止条件：回复中出现 stop phrase（区分大小写的精确子串）即结束本阶段的轮转

/// 空 stop phrase 永不触发
pub fn should_stop(reply: &str, stop_phrase: &str) -> bool {
    !stop_phrase.is_empty() && reply.contains(stop_phrase)
}
