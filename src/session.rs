//! Remote session management over SSH
//!
//! Provides the authenticated command-execution channel used by the health
//! controller. One `Session` maps to one TCP connection; each command runs on
//! its own exec channel.

use crate::error::{Error, Result};
use crate::manifest::LifeboatConfig;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

/// Host key verification policy
///
/// `KnownHosts` rejects hosts that are missing from or mismatch the OpenSSH
/// known hosts file. `AcceptAny` skips verification entirely and is an
/// explicit, insecure opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    #[default]
    KnownHosts,
    AcceptAny,
}

/// Output of one remote command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Remote exit status
    pub exit_status: i32,
}

/// A sink for remote commands
///
/// `Session` is the real implementation; tests drive the health controller
/// with scripted runners instead.
pub trait CommandRunner {
    /// Execute a command remotely and capture its output
    fn run(&mut self, command: &str) -> Result<CommandOutput>;

    /// Release the underlying connection (idempotent)
    fn close(&mut self) -> Result<()>;
}

/// An open, authenticated SSH session to the configured host
pub struct Session {
    raw: ssh2::Session,
    endpoint: String,
    verbose: bool,
    closed: bool,
}

impl Session {
    /// Connect, verify the host key, and authenticate with the configured key
    pub fn open(config: &LifeboatConfig) -> Result<Session> {
        let endpoint = config.endpoint();

        // Fail on an unreadable key before touching the network
        std::fs::metadata(&config.ssh.key_path).map_err(|e| Error::KeyRead {
            path: config.ssh.key_path.clone(),
            source: e,
        })?;

        let tcp = TcpStream::connect(&endpoint).map_err(|e| Error::Connection {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        let timeout = Duration::from_secs(config.ssh.timeout_secs);
        tcp.set_read_timeout(Some(timeout)).ok();
        tcp.set_write_timeout(Some(timeout)).ok();

        let mut raw = ssh2::Session::new().map_err(|e| Error::Connection {
            endpoint: endpoint.clone(),
            message: format!("Failed to create SSH session: {}", e),
        })?;

        raw.set_tcp_stream(tcp);
        raw.set_timeout(config.ssh.timeout_secs as u32 * 1000); // milliseconds

        raw.handshake().map_err(|e| Error::Connection {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        verify_host_key(&raw, config)?;

        let passphrase = config
            .ssh
            .key_passphrase
            .as_ref()
            .map(|p| p.expose_secret());
        raw.userauth_pubkey_file(&config.host.user, None, &config.ssh.key_path, passphrase)
            .map_err(|e| Error::Auth {
                user: config.host.user.clone(),
                message: e.to_string(),
            })?;

        if !raw.authenticated() {
            return Err(Error::Auth {
                user: config.host.user.clone(),
                message: "Authentication failed".to_string(),
            });
        }

        Ok(Session {
            raw,
            endpoint,
            verbose: false,
            closed: false,
        })
    }

    /// Echo each remote command before running it
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Remote endpoint this session is bound to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CommandRunner for Session {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let summary = command_summary(command);

        if self.verbose {
            println!("Running on {}: {}", self.endpoint, summary);
        }

        let mut channel = self
            .raw
            .channel_session()
            .map_err(|e| Error::Channel(e.to_string()))?;

        channel.exec(command).map_err(|e| Error::RemoteExec {
            command: summary.clone(),
            message: e.to_string(),
        })?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| Error::RemoteExec {
                command: summary.clone(),
                message: format!("Failed to read output: {}", e),
            })?;

        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| Error::RemoteExec {
                command: summary.clone(),
                message: format!("Failed to read stderr: {}", e),
            })?;

        channel.wait_close().ok();
        let exit_status = channel.exit_status().map_err(|e| Error::RemoteExec {
            command: summary,
            message: format!("Failed to read exit status: {}", e),
        })?;

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_status,
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.raw
            .disconnect(None, "Closing connection", None)
            .map_err(|e| Error::Channel(format!("Failed to disconnect: {}", e)))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.raw.disconnect(None, "Closing connection", None);
        }
    }
}

/// Check the server's host key against the configured policy
fn verify_host_key(session: &ssh2::Session, config: &LifeboatConfig) -> Result<()> {
    let host = &config.host.address;

    let (key, _key_type) = session.host_key().ok_or(Error::HostKeyUnavailable)?;

    match config.ssh.host_key_policy {
        HostKeyPolicy::AcceptAny => {
            eprintln!("Warning: host key verification disabled for {}", host);
            Ok(())
        }
        HostKeyPolicy::KnownHosts => {
            let path = config.ssh.known_hosts_path();

            let mut known = session.known_hosts().map_err(|e| Error::KnownHostsRead {
                path: path.clone(),
                message: e.to_string(),
            })?;
            known
                .read_file(&path, ssh2::KnownHostFileKind::OpenSSH)
                .map_err(|e| Error::KnownHostsRead {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            match known.check_port(host, config.host.port, key) {
                ssh2::CheckResult::Match => Ok(()),
                ssh2::CheckResult::Mismatch => Err(Error::HostKeyMismatch { host: host.clone() }),
                ssh2::CheckResult::NotFound => Err(Error::HostKeyUnknown { host: host.clone() }),
                ssh2::CheckResult::Failure => Err(Error::KnownHostsRead {
                    path,
                    message: "Host key check failed".to_string(),
                }),
            }
        }
    }
}

/// First line of a (possibly multi-line) command, for messages and errors
fn command_summary(command: &str) -> String {
    command
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}
