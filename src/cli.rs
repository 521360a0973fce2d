//! 命令行定义（clap derive）

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "chatrunner",
    version,
    about = "CLI for invoking an LLM in either a single call or a back-and-forth session",
    after_help = "Examples:\n  $ <something that generates a prompt> | chatrunner respond\n  $ chatrunner selfchat --file debate --num-rounds 3"
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Extra config file layered over config/default.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a response for the prompt read from stdin.
    Respond,
    /// Chat interactively with a single agent; enter `Q` to quit.
    Chat,
    /// Run a scripted conversation between several agents.
    Selfchat {
        /// Script name inside the scripts directory, without extension.
        #[arg(short, long)]
        file: String,

        /// Override numRounds for every phase.
        #[arg(short, long)]
        num_rounds: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selfchat() {
        let cli = Cli::parse_from([
            "chatrunner",
            "--debug",
            "selfchat",
            "--file",
            "debate",
            "--num-rounds",
            "4",
        ]);
        assert!(cli.debug);
        match cli.command {
            Command::Selfchat { file, num_rounds } => {
                assert_eq!(file, "debate");
                assert_eq!(num_rounds, Some(4));
            }
            other => panic!("Expected Selfchat, got {:?}", other),
        }
    }

    #[test]
    fn test_selfchat_requires_file() {
        assert!(Cli::try_parse_from(["chatrunner", "selfchat"]).is_err());
    }

    #[test]
    fn test_parse_respond_without_debug() {
        let cli = Cli::parse_from(["chatrunner", "respond"]);
        assert!(!cli.debug);
        assert!(matches!(cli.command, Command::Respond));
    }
}
