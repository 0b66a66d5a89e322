//! Command-line interface for Lifeboat
//!
//! Uses clap with derive for type-safe CLI parsing

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Lifeboat - remote MySQL rescue over SSH
#[derive(Parser)]
#[command(name = "lifeboat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "lifeboat.toml")]
    pub config: PathBuf,

    /// Enable verbose output (echoes remote commands)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Probe the remote MySQL daemon and print its status
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Probe and, if the daemon is down, restart it once and re-probe
    Repair {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Open the interactive operator console
    Console,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "lifeboat", &mut std::io::stdout());
    }
}
