//! Service health checking and repair
//!
//! Probes the MySQL daemon on the remote host by cross-checking its PID file
//! against the live process table, and restarts the service unit when the
//! daemon is down. One invocation performs at most one restart attempt.

use crate::error::{Error, Result};
use crate::session::{CommandOutput, CommandRunner};
use serde::Serialize;
use std::fmt;

/// Probe token emitted when the daemon is alive
pub const RUNNING_TOKEN: &str = "Running";

/// Probe token emitted when the daemon is down
pub const NOT_RUNNING_TOKEN: &str = "Not running";

/// Status probe: the PID file must exist and its PID must appear in the
/// process table, otherwise the daemon is considered down.
const PROBE_SCRIPT: &str = r#"
pidfile=/var/run/mysqld/mysqld.pid
if [ -f $pidfile ]; then
    varpid=$(cat $pidfile)
    found=$(ps aux | awk '{print $2}' | grep -w $varpid)
    if [ -z "$found" ]; then
        echo "Not running"
    else
        echo "Running"
    fi
else
    echo "Not running"
fi
"#;

/// Restart command for the service unit. Not idempotent; callers serialize.
const RESTART_COMMAND: &str = "service mysql restart";

/// Running state of the remote daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    NotRunning,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running => write!(f, "{}", RUNNING_TOKEN),
            ServiceStatus::NotRunning => write!(f, "{}", NOT_RUNNING_TOKEN),
        }
    }
}

/// Net effect of one check-and-repair invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartOutcome {
    /// The daemon was already up; no restart was issued
    AlreadyRunning,
    /// The daemon was down and came back after the restart
    Restarted,
    /// The daemon was down and stayed down after the restart
    RestartFailed,
}

impl fmt::Display for RestartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartOutcome::AlreadyRunning => write!(f, "already running"),
            RestartOutcome::Restarted => write!(f, "restarted successfully"),
            RestartOutcome::RestartFailed => write!(f, "restart failed"),
        }
    }
}

impl RestartOutcome {
    /// Status the daemon was left in, as implied by the outcome
    pub fn final_status(&self) -> ServiceStatus {
        match self {
            RestartOutcome::AlreadyRunning | RestartOutcome::Restarted => ServiceStatus::Running,
            RestartOutcome::RestartFailed => ServiceStatus::NotRunning,
        }
    }
}

/// Run the status probe and parse its output
///
/// Only the two exact trimmed tokens are accepted; anything else is an
/// `UnexpectedOutput` error rather than a silent "not running".
pub fn probe_status<R: CommandRunner>(runner: &mut R) -> Result<ServiceStatus> {
    let output = runner.run(PROBE_SCRIPT)?;
    parse_status(&output.stdout)
}

fn parse_status(raw: &str) -> Result<ServiceStatus> {
    match raw.trim() {
        RUNNING_TOKEN => Ok(ServiceStatus::Running),
        NOT_RUNNING_TOKEN => Ok(ServiceStatus::NotRunning),
        other => Err(Error::UnexpectedOutput {
            output: other.to_string(),
        }),
    }
}

/// Request a restart of the service unit
pub fn restart<R: CommandRunner>(runner: &mut R) -> Result<CommandOutput> {
    runner.run(RESTART_COMMAND)
}

/// Probe, restart if down, re-probe, classify
///
/// No retries: a failed restart is terminal for this invocation and the
/// caller decides whether to try again.
pub fn check_and_repair<R: CommandRunner>(runner: &mut R) -> Result<RestartOutcome> {
    match probe_status(runner)? {
        ServiceStatus::Running => Ok(RestartOutcome::AlreadyRunning),
        ServiceStatus::NotRunning => {
            restart(runner)?;
            match probe_status(runner)? {
                ServiceStatus::Running => Ok(RestartOutcome::Restarted),
                ServiceStatus::NotRunning => Ok(RestartOutcome::RestartFailed),
            }
        }
    }
}

/// Check-and-repair with a guaranteed close of the runner, on success and on
/// every error path alike
pub fn run_once<R: CommandRunner>(runner: &mut R) -> Result<RestartOutcome> {
    let outcome = check_and_repair(runner);
    let closed = runner.close();
    let outcome = outcome?;
    closed?;
    Ok(outcome)
}

/// Single probe with a guaranteed close of the runner
pub fn probe_once<R: CommandRunner>(runner: &mut R) -> Result<ServiceStatus> {
    let status = probe_status(runner);
    let closed = runner.close();
    let status = status?;
    closed?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted remote host for driving the controller without a network
    struct SimulatedHost {
        running: bool,
        restart_effective: bool,
        probe_error: bool,
        restart_error: bool,
        probe_output: Option<String>,
        probes: usize,
        restarts: usize,
        closes: usize,
    }

    impl SimulatedHost {
        fn new(running: bool) -> Self {
            Self {
                running,
                restart_effective: false,
                probe_error: false,
                restart_error: false,
                probe_output: None,
                probes: 0,
                restarts: 0,
                closes: 0,
            }
        }

        fn with_effective_restart(mut self) -> Self {
            self.restart_effective = true;
            self
        }

        fn with_probe_error(mut self) -> Self {
            self.probe_error = true;
            self
        }

        fn with_restart_error(mut self) -> Self {
            self.restart_error = true;
            self
        }

        fn with_probe_output(mut self, output: &str) -> Self {
            self.probe_output = Some(output.to_string());
            self
        }

        fn ok(stdout: &str) -> CommandOutput {
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_status: 0,
            }
        }
    }

    impl CommandRunner for SimulatedHost {
        fn run(&mut self, command: &str) -> Result<CommandOutput> {
            if command == RESTART_COMMAND {
                self.restarts += 1;
                if self.restart_error {
                    return Err(Error::RemoteExec {
                        command: command.to_string(),
                        message: "channel broken".to_string(),
                    });
                }
                if self.restart_effective {
                    self.running = true;
                }
                Ok(Self::ok(""))
            } else {
                self.probes += 1;
                if self.probe_error {
                    return Err(Error::RemoteExec {
                        command: "probe".to_string(),
                        message: "channel broken".to_string(),
                    });
                }
                if let Some(output) = &self.probe_output {
                    return Ok(Self::ok(output));
                }
                let token = if self.running {
                    RUNNING_TOKEN
                } else {
                    NOT_RUNNING_TOKEN
                };
                Ok(Self::ok(&format!("{}\n", token)))
            }
        }

        fn close(&mut self) -> Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_parse_status_tokens() {
        assert_eq!(parse_status("Running").unwrap(), ServiceStatus::Running);
        assert_eq!(
            parse_status("Not running").unwrap(),
            ServiceStatus::NotRunning
        );
        // Surrounding whitespace is trimmed
        assert_eq!(
            parse_status("  Running\n").unwrap(),
            ServiceStatus::Running
        );
    }

    #[test]
    fn test_parse_status_rejects_anything_else() {
        for garbage in ["", "running", "RUNNING", "mysqld is up", "Not Running"] {
            assert!(
                matches!(
                    parse_status(garbage),
                    Err(Error::UnexpectedOutput { .. })
                ),
                "'{}' must not parse",
                garbage
            );
        }
    }

    #[test]
    fn test_already_running_skips_restart() {
        let mut host = SimulatedHost::new(true);
        let outcome = check_and_repair(&mut host).unwrap();

        assert_eq!(outcome, RestartOutcome::AlreadyRunning);
        assert_eq!(host.probes, 1);
        assert_eq!(host.restarts, 0);
    }

    #[test]
    fn test_down_daemon_restarted() {
        let mut host = SimulatedHost::new(false).with_effective_restart();
        let outcome = check_and_repair(&mut host).unwrap();

        assert_eq!(outcome, RestartOutcome::Restarted);
        assert_eq!(host.probes, 2);
        assert_eq!(host.restarts, 1);
    }

    #[test]
    fn test_ineffective_restart_reported_as_failed() {
        // Restart runs but the daemon stays down
        let mut host = SimulatedHost::new(false);
        let outcome = check_and_repair(&mut host).unwrap();

        assert_eq!(outcome, RestartOutcome::RestartFailed);
        assert_eq!(host.probes, 2);
        assert_eq!(host.restarts, 1);
    }

    #[test]
    fn test_probe_failure_aborts_before_restart() {
        let mut host = SimulatedHost::new(false).with_probe_error();
        let result = check_and_repair(&mut host);

        assert!(matches!(result, Err(Error::RemoteExec { .. })));
        assert_eq!(host.restarts, 0);
    }

    #[test]
    fn test_restart_failure_aborts_invocation() {
        let mut host = SimulatedHost::new(false).with_restart_error();
        let result = check_and_repair(&mut host);

        assert!(matches!(result, Err(Error::RemoteExec { .. })));
        assert_eq!(host.probes, 1);
        assert_eq!(host.restarts, 1);
    }

    #[test]
    fn test_unexpected_output_is_not_coerced() {
        let mut host = SimulatedHost::new(false).with_probe_output("mysqld: unrecognized service\n");
        let result = check_and_repair(&mut host);

        assert!(matches!(result, Err(Error::UnexpectedOutput { .. })));
        assert_eq!(host.restarts, 0);
    }

    #[test]
    fn test_run_once_closes_on_success() {
        let mut host = SimulatedHost::new(true);
        let outcome = run_once(&mut host).unwrap();

        assert_eq!(outcome, RestartOutcome::AlreadyRunning);
        assert_eq!(host.closes, 1);
    }

    #[test]
    fn test_run_once_closes_on_probe_error() {
        let mut host = SimulatedHost::new(false).with_probe_error();
        assert!(run_once(&mut host).is_err());
        assert_eq!(host.closes, 1);
    }

    #[test]
    fn test_run_once_closes_on_restart_error() {
        let mut host = SimulatedHost::new(false).with_restart_error();
        assert!(run_once(&mut host).is_err());
        assert_eq!(host.closes, 1);
    }

    #[test]
    fn test_run_once_closes_on_unexpected_output() {
        let mut host = SimulatedHost::new(false).with_probe_output("garbage");
        assert!(run_once(&mut host).is_err());
        assert_eq!(host.closes, 1);
    }

    #[test]
    fn test_probe_once_closes() {
        let mut host = SimulatedHost::new(true);
        let status = probe_once(&mut host).unwrap();

        assert_eq!(status, ServiceStatus::Running);
        assert_eq!(host.probes, 1);
        assert_eq!(host.closes, 1);
    }

    #[test]
    fn test_outcome_final_status() {
        assert_eq!(
            RestartOutcome::AlreadyRunning.final_status(),
            ServiceStatus::Running
        );
        assert_eq!(
            RestartOutcome::Restarted.final_status(),
            ServiceStatus::Running
        );
        assert_eq!(
            RestartOutcome::RestartFailed.final_status(),
            ServiceStatus::NotRunning
        );
    }

    #[test]
    fn test_status_display_matches_tokens() {
        assert_eq!(ServiceStatus::Running.to_string(), "Running");
        assert_eq!(ServiceStatus::NotRunning.to_string(), "Not running");
    }
}
