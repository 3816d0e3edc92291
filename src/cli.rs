use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bizchat",
    about = "Terminal client for the business assistant chatbot (CLI + TUI)"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start TUI shell
    Run,
    /// Send one message in the current session and print the reply
    Send {
        /// Message text
        message: String,
    },
    /// Answer a business selection request with a business id
    Select {
        /// Id from `bizchat businesses`
        business_id: String,
        /// Name to show in the transcript instead of the id
        #[arg(long)]
        name: Option<String>,
    },
    /// List selectable businesses
    Businesses {
        /// Case-insensitive filter on name or description
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Print the current session transcript
    History,
    /// Discard the current session and start a new one
    Reset,
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
