//! CLI interface for updown-bot
//!
//! Provides subcommands for:
//! - `run`: Start the trading loop (paper mode against the simulated venue)
//! - `status`: Show current state
//! - `config`: Show the resolved configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "updown-bot")]
#[command(about = "Decision engine for recurring 15-minute binary up/down markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading loop
    Run(RunArgs),
    /// Show current state
    Status,
    /// Show the resolved configuration
    Config,
}
