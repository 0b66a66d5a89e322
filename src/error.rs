//! Unified error types for Lifeboat

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Lifeboat operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    // Credential errors
    #[error("Failed to read private key '{path}': {source}")]
    KeyRead { path: PathBuf, source: io::Error },

    #[error("Authentication failed for user '{user}': {message}")]
    Auth { user: String, message: String },

    // Connection errors
    #[error("Failed to connect to '{endpoint}': {message}")]
    Connection { endpoint: String, message: String },

    // Host key verification errors
    #[error("Host key for '{host}' not found in known hosts (add it or opt into accept-any)")]
    HostKeyUnknown { host: String },

    #[error("Host key for '{host}' does not match its known hosts entry")]
    HostKeyMismatch { host: String },

    #[error("Server did not present a host key")]
    HostKeyUnavailable,

    #[error("Failed to read known hosts file '{path}': {message}")]
    KnownHostsRead { path: PathBuf, message: String },

    // Session errors
    #[error("Failed to open command channel: {0}")]
    Channel(String),

    // Remote execution errors
    #[error("Remote command '{command}' failed: {message}")]
    RemoteExec { command: String, message: String },

    // Probe output errors
    #[error("Unexpected probe output: '{output}'")]
    UnexpectedOutput { output: String },
}

/// Result type alias for Lifeboat operations
pub type Result<T> = std::result::Result<T, Error>;
