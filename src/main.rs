use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use minerdash::cli::{self, ConfigAction};

#[derive(Debug, Parser)]
#[command(name = "minerdash")]
#[command(about = "Terminal dashboard and chat for a mining-rig backend")]
struct App {
    /// Backend base URL (overrides config and MINERDASH_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Live stats panel plus chat. Type /help inside for commands.
    Watch {
        /// Write the chat log as HTML to this file on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Fetch system and mining stats once
    Stats {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Send a single chat message and print the reply
    Ask {
        /// The message to send
        #[arg(trailing_var_arg = true, required = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    /// Check backend health and module availability
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Show recent activity log entries
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        lines: usize,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.minerdash/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `poller.interval_ms 5000`
    Set { key: String, value: String },
    /// Overwrite the global config with defaults
    Reset,
    /// Show where config files are read from
    Path,
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = cli::resolve_config(app.url);

    match app.command {
        Commands::Watch { transcript } => cli::run_watch(&config, transcript),
        Commands::Stats { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(&config, fmt)
        }
        Commands::Ask { message } => {
            let message = message.join(" ");
            cli::run_ask(&config, &message)
        }
        Commands::Health => cli::run_health(&config),
        Commands::Config { action } => cli::run_config(match action {
            ConfigCommand::Show => ConfigAction::Show,
            ConfigCommand::Init { force } => ConfigAction::Init { force },
            ConfigCommand::Set { key, value } => ConfigAction::Set { key, value },
            ConfigCommand::Reset => ConfigAction::Reset,
            ConfigCommand::Path => ConfigAction::Path,
        }),
        Commands::Log { lines } => cli::run_log(&config, lines),
    }
}
