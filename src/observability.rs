//! 可观测性：tracing 日志初始化
//!
//! 日志写到 stderr，stdout 只留给命令输出（respond 结果、chat 回复、selfchat 记录）。

use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认级别 info，`--debug` 时为 debug；RUST_LOG 可进一步覆盖
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let directive: Directive = level.parse().unwrap_or_else(|_| LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(directive))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
