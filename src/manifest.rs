//! Configuration file parsing for Lifeboat
//!
//! Parses `lifeboat.toml` configuration files using serde, then overlays
//! `.env`/environment settings (`SERVER_URL`).

use crate::error::{Error, Result};
use crate::session::HostKeyPolicy;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load configuration from a file, falling back to defaults when the file
/// does not exist, then apply environment overrides.
pub fn load(path: &Path) -> Result<LifeboatConfig> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content)?
    } else {
        LifeboatConfig::default()
    };

    // Load .env if present, then let SERVER_URL override the config file.
    let _ = dotenvy::dotenv();
    if let Ok(address) = std::env::var("SERVER_URL") {
        config.host.address = address;
    }

    config.validate()?;

    Ok(config)
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LifeboatConfig {
    /// Remote host settings
    #[serde(default)]
    pub host: HostConfig,

    /// SSH transport settings
    #[serde(default)]
    pub ssh: SshSettings,
}

impl LifeboatConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.address.is_empty() {
            return Err(Error::ConfigValidation(
                "No host address configured (set [host] address or SERVER_URL)".into(),
            ));
        }

        if self.host.port == 0 {
            return Err(Error::ConfigValidation("Port must be non-zero".into()));
        }

        if self.host.user.is_empty() {
            return Err(Error::ConfigValidation("User must not be empty".into()));
        }

        if self.ssh.timeout_secs == 0 {
            return Err(Error::ConfigValidation(
                "timeout_secs must be non-zero".into(),
            ));
        }

        Ok(())
    }

    /// host:port endpoint string used for connecting and error messages
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host.address, self.host.port)
    }
}

/// Remote host settings (`[host]` table)
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Hostname or IP address (SERVER_URL environment variable overrides)
    #[serde(default)]
    pub address: String,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote user
    #[serde(default = "default_user")]
    pub user: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: default_port(),
            user: default_user(),
        }
    }
}

/// SSH transport settings (`[ssh]` table)
#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    /// Path to the private key file
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// Optional passphrase for the private key
    #[serde(default)]
    pub key_passphrase: Option<SecretString>,

    /// Per-command timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Host key verification policy
    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,

    /// Known hosts file (defaults to ~/.ssh/known_hosts)
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

impl SshSettings {
    /// Resolve the known hosts file path
    pub fn known_hosts_path(&self) -> PathBuf {
        self.known_hosts.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".ssh")
                .join("known_hosts")
        })
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            key_passphrase: None,
            timeout_secs: default_timeout(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts: None,
        }
    }
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

fn default_key_path() -> PathBuf {
    PathBuf::from(".ssh/id_ed25519")
}

fn default_timeout() -> u64 {
    30
}
