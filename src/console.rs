//! Interactive operator console
//!
//! Renders the last-known MySQL status and lets the operator re-trigger the
//! restart. Each confirmation opens a fresh session, runs one check-and-repair
//! round trip, and refreshes the displayed status. Errors are shown inline;
//! the loop keeps running until the operator quits.

use crate::error::{Error, Result};
use crate::manifest::LifeboatConfig;
use crate::session::Session;
use crate::sickbay::{self, RestartOutcome, ServiceStatus};
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};
use std::io;

/// Run the console loop until the operator quits
pub fn run(config: &LifeboatConfig, verbose: bool) -> Result<()> {
    println!(
        "{}",
        style(format!("Lifeboat console for {}", config.endpoint())).bold()
    );

    let mut last_status = match probe(config, verbose) {
        Ok(status) => status_line(status),
        Err(e) => {
            println!("{} {}", style("Error:").red().bold(), e);
            style("unknown").dim().to_string()
        }
    };

    loop {
        println!();
        println!("Current MySQL status: {}", last_status);

        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Type 'yes' to restart MySQL ('q' to quit)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Io(io::Error::other(e)))?;

        match input.trim() {
            "yes" => match repair(config, verbose) {
                Ok(outcome) => {
                    report_outcome(outcome);
                    last_status = status_line(outcome.final_status());
                }
                Err(e) => {
                    println!("{} {}", style("Error:").red().bold(), e);
                }
            },
            "q" | "quit" | "exit" => break,
            // Empty input just redraws the status line
            "" => {}
            _ => println!("Unrecognized input. Type 'yes' to restart or 'q' to quit."),
        }
    }

    Ok(())
}

fn probe(config: &LifeboatConfig, verbose: bool) -> Result<ServiceStatus> {
    let mut session = Session::open(config)?.with_verbose(verbose);
    sickbay::probe_once(&mut session)
}

fn repair(config: &LifeboatConfig, verbose: bool) -> Result<RestartOutcome> {
    let mut session = Session::open(config)?.with_verbose(verbose);
    sickbay::run_once(&mut session)
}

fn report_outcome(outcome: RestartOutcome) {
    match outcome {
        RestartOutcome::AlreadyRunning => {
            println!("MySQL is already running; no restart issued.");
        }
        RestartOutcome::Restarted => {
            println!("{}", style("MySQL restarted successfully.").green());
        }
        RestartOutcome::RestartFailed => {
            println!(
                "{}",
                style("Restart issued but MySQL is still down.").red()
            );
        }
    }
}

fn status_line(status: ServiceStatus) -> String {
    match status {
        ServiceStatus::Running => style(status.to_string()).green().to_string(),
        ServiceStatus::NotRunning => style(status.to_string()).red().to_string(),
    }
}
