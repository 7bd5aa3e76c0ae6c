// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session configuration management.
//!
//! Configuration is stored as TOML, by default in
//! `<config dir>/devicehive/session.toml`, and includes:
//! - `service_url`: base URL of the DeviceHive REST API
//! - `channels`: channel preference order (`websocket`, `longpolling`)
//! - `[credential]`: `login` + `password`, or `access_key`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credential;
use crate::channel::ChannelKind;
use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "devicehive";
const CONFIG_FILE_NAME: &str = "session.toml";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the REST API, e.g. `http://hive.example/api`.
    pub service_url: String,
    /// Channel preference order (default: websocket, then longpolling).
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,
    /// Deadline of one socket request in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay before a failed poll is retried in milliseconds (default: 1000).
    #[serde(default = "default_poll_retry_ms")]
    pub poll_retry_ms: u64,
    /// Overall timeout of one HTTP call in seconds. Absent means none, so
    /// long polls are bounded by the server only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
    // Tables must follow plain values in TOML
    pub credential: Credential,
}

fn default_channels() -> Vec<ChannelKind> {
    ChannelKind::ALL.to_vec()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_poll_retry_ms() -> u64 {
    1_000
}

impl SessionConfig {
    /// Creates a config with default channels and timeouts.
    pub fn new(service_url: impl Into<String>, credential: Credential) -> Self {
        SessionConfig {
            service_url: service_url.into(),
            channels: default_channels(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_retry_ms: default_poll_retry_ms(),
            http_timeout_secs: None,
            credential,
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Checks the values a session cannot start without.
    pub fn validate(&self) -> Result<()> {
        let url = self.service_url.trim();
        let host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match host {
            None => {
                return Err(Error::Config(format!(
                    "invalid service_url '{}'\n  hint: use an http:// or https:// URL",
                    self.service_url
                )))
            }
            Some(host) if host.trim_matches('/').is_empty() => {
                return Err(Error::Config(format!(
                    "service_url '{}' has no host",
                    self.service_url
                )))
            }
            Some(_) => {}
        }
        if self.channels.is_empty() {
            return Err(Error::Config(
                "no channels configured\n  hint: set channels = [\"websocket\", \"longpolling\"]"
                    .to_string(),
            ));
        }
        match &self.credential {
            Credential::Basic { login, .. } if login.is_empty() => {
                Err(Error::Config("credential login is empty".to_string()))
            }
            Credential::AccessKey { access_key } if access_key.is_empty() => {
                Err(Error::Config("credential access_key is empty".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_retry(&self) -> Duration {
        Duration::from_millis(self.poll_retry_ms)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
