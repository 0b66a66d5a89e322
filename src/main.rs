//! Lifeboat - remote MySQL rescue over SSH
//!
//! Connects to a single remote host, checks whether the MySQL daemon is
//! alive by cross-checking its PID file against the process table, and
//! restarts the service unit when it is down.

mod cli;
mod console;
mod error;
mod manifest;
mod session;
mod sickbay;

use cli::{Cli, Commands};
use error::Result;
use session::Session;
use sickbay::{RestartOutcome, ServiceStatus};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Completion { shell } => {
            cli::Cli::generate_completion(shell);
            Ok(())
        }

        Commands::Status { json } => {
            let config = manifest::load(&cli.config)?;
            let mut session = Session::open(&config)?.with_verbose(cli.verbose);
            let status = sickbay::probe_once(&mut session)?;

            if json {
                let report = serde_json::json!({
                    "host": config.host.address,
                    "service": "mysql",
                    "status": status,
                });
                println!("{}", serde_json::to_string_pretty(&report).unwrap());
            } else {
                println!("MySQL on {}: {}", config.host.address, status);
            }

            Ok(())
        }

        Commands::Repair { json } => {
            let config = manifest::load(&cli.config)?;
            let mut session = Session::open(&config)?.with_verbose(cli.verbose);
            let outcome = sickbay::run_once(&mut session)?;

            if json {
                let report = serde_json::json!({
                    "host": config.host.address,
                    "service": "mysql",
                    "outcome": outcome,
                    "status": outcome.final_status(),
                });
                println!("{}", serde_json::to_string_pretty(&report).unwrap());
            } else {
                match outcome {
                    RestartOutcome::AlreadyRunning => {
                        println!("MySQL on {} is already running.", config.host.address);
                    }
                    RestartOutcome::Restarted => {
                        println!("MySQL on {} restarted successfully.", config.host.address);
                    }
                    RestartOutcome::RestartFailed => {
                        println!(
                            "MySQL on {} is still down after the restart.",
                            config.host.address
                        );
                    }
                }
            }

            // A restart that did not bring the daemon back is an operational
            // failure even though the invocation itself completed.
            if outcome.final_status() == ServiceStatus::NotRunning {
                std::process::exit(1);
            }

            Ok(())
        }

        Commands::Console => {
            let config = manifest::load(&cli.config)?;
            console::run(&config, cli.verbose)
        }
    }
}
