//! Configuration loading.
//!
//! Reads `config.json` from the wsterm configuration directory and applies
//! environment variable overrides. The token is never written back to disk;
//! it usually arrives through `WSTERM_TOKEN`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::constants::{
    DEFAULT_RESOURCE, DEFAULT_SERVER_URL, PONG_WAIT, RESIZE_POLL_INTERVAL, WRITE_WAIT,
};
use crate::handshake::{SessionContext, SessionCredentials};
use crate::session::Timings;

/// How terminal resizes are detected.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Signal-based where the platform has one, polling otherwise.
    #[default]
    Auto,
    /// `SIGWINCH` notifications (unix only).
    Signal,
    /// Compare sizes on a fixed interval.
    Poll,
}

impl std::str::FromStr for ResizeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "signal" => Ok(Self::Signal),
            "poll" => Ok(Self::Poll),
            other => anyhow::bail!("unknown resize mode '{}'", other),
        }
    }
}

/// Configuration for the wsterm CLI.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Base URL of the API server.
    pub server_url: String,
    /// API token. Read from file or env, never serialized.
    #[serde(skip_serializing)]
    pub token: String,
    /// API resource whose `actions/ssh` endpoint starts sessions.
    pub resource: String,
    /// Seconds allowed for a single write.
    pub write_wait_secs: u64,
    /// Seconds allowed between pongs before the connection is declared dead.
    pub pong_wait_secs: u64,
    /// Resize detection strategy.
    pub resize_mode: ResizeMode,
    /// Poll interval in milliseconds for [`ResizeMode::Poll`].
    pub resize_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: String::new(),
            resource: DEFAULT_RESOURCE.to_string(),
            write_wait_secs: WRITE_WAIT.as_secs(),
            pong_wait_secs: PONG_WAIT.as_secs(),
            resize_mode: ResizeMode::Auto,
            resize_poll_ms: RESIZE_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `WSTERM_CONFIG_DIR` wins; otherwise the platform config dir
    /// (Linux: `~/.config/wsterm`).
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("WSTERM_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("wsterm"))
    }

    /// Log file location.
    ///
    /// `WSTERM_LOG_FILE`, else `wsterm.log` in [`Config::config_dir`], else
    /// the temp dir.
    pub fn log_path() -> PathBuf {
        if let Ok(path) = std::env::var("WSTERM_LOG_FILE") {
            return PathBuf::from(path);
        }
        match Self::config_dir() {
            Ok(dir) => dir.join("wsterm.log"),
            Err(_no_config_dir) => std::env::temp_dir().join("wsterm.log"),
        }
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?.unwrap_or_default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_from_file() -> Result<Option<Self>> {
        let config_path = Self::config_dir()?.join("config.json");
        if !config_path.exists() {
            log::debug!("No config file at {}", config_path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))?;
        Ok(Some(config))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(server_url) = std::env::var("WSTERM_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Ok(token) = std::env::var("WSTERM_TOKEN") {
            self.token = token;
        }

        if let Ok(resource) = std::env::var("WSTERM_RESOURCE") {
            self.resource = resource;
        }

        if let Ok(write_wait) = std::env::var("WSTERM_WRITE_WAIT_SECS") {
            if let Ok(secs) = write_wait.parse::<u64>() {
                self.write_wait_secs = secs;
            }
        }

        if let Ok(pong_wait) = std::env::var("WSTERM_PONG_WAIT_SECS") {
            if let Ok(secs) = pong_wait.parse::<u64>() {
                self.pong_wait_secs = secs;
            }
        }

        if let Ok(mode) = std::env::var("WSTERM_RESIZE_MODE") {
            self.resize_mode = mode.parse()?;
        }

        Ok(())
    }

    /// Session timings derived from the configured deadlines.
    pub fn timings(&self) -> Result<Timings> {
        Timings::from_deadlines(
            Duration::from_secs(self.write_wait_secs),
            Duration::from_secs(self.pong_wait_secs),
        )
    }

    /// Poll interval for [`ResizeMode::Poll`].
    pub fn resize_poll_interval(&self) -> Duration {
        Duration::from_millis(self.resize_poll_ms.max(1))
    }
}

impl SessionContext for Config {
    fn credentials(&self) -> Result<SessionCredentials> {
        if self.token.is_empty() {
            anyhow::bail!("No API token configured (set WSTERM_TOKEN or \"token\" in config.json)");
        }
        Ok(SessionCredentials {
            server_url: self.server_url.clone(),
            token: self.token.clone(),
        })
    }
}
