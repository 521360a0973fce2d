//! chatrunner 入口：初始化日志、加载配置，分发 respond / chat / selfchat 子命令。

use anyhow::Context;
use chatrunner::{
    agent::{create_llm_from_config, load_config_or_default},
    cli::{Cli, Command},
    commands::{chat_agent, chat_loop, read_prompt, respond, selfchat},
    observability,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.debug);
    tracing::debug!("CLI: {:?}", cli);

    let cfg = load_config_or_default(cli.config.clone());

    match cli.command {
        Command::Respond => {
            let prompt = read_prompt(&mut tokio::io::stdin()).await?;
            let llm = create_llm_from_config(&cfg);
            let result = respond(llm.as_ref(), &prompt).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Chat => {
            let mut agent = chat_agent(create_llm_from_config(&cfg), &cfg);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            chat_loop(&mut agent, stdin, &mut stdout)
                .await
                .context("Chat session failed")?;
        }
        Command::Selfchat { file, num_rounds } => {
            let report = selfchat(&cfg, &file, num_rounds, cli.debug).await?;
            tracing::info!(
                run_id = %report.run_id,
                phases = report.phases.len(),
                invocations = report.total_invocations(),
                "Self-chat complete"
            );
        }
    }

    Ok(())
}
