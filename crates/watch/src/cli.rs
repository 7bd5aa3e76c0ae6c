// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line arguments and how they combine with the config file.

use std::path::PathBuf;

use clap::Parser;
use devicehive::{ChannelKind, Credential, Devices, Error, Result, SessionConfig};
use serde_json::Value;

/// dh-watch: Watch DeviceHive device notifications
#[derive(Parser, Debug)]
#[command(name = "dh-watch")]
#[command(about = "Print DeviceHive notifications as JSON lines and send commands")]
pub struct Args {
    /// Session config file (default: <config dir>/devicehive/session.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// REST API URL, e.g. http://hive.example/api
    #[arg(long)]
    pub url: Option<String>,

    /// Login for password authentication
    #[arg(long, requires = "password", conflicts_with = "access_key")]
    pub login: Option<String>,

    /// Password for password authentication
    #[arg(long, requires = "login")]
    pub password: Option<String>,

    /// Access key for token authentication
    #[arg(long)]
    pub access_key: Option<String>,

    /// Channel to try, in order (websocket, longpolling); repeatable
    #[arg(long = "channel")]
    pub channels: Vec<ChannelKind>,

    /// Device to watch; repeatable, none means all devices
    #[arg(long = "device")]
    pub devices: Vec<String>,

    /// Command to send to the first --device
    #[arg(long, requires = "devices")]
    pub command: Option<String>,

    /// Command parameters as JSON
    #[arg(long, requires = "command")]
    pub parameters: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolves the session config: file first, then flags on top.
    ///
    /// Without `--config`, the default file is used when it exists.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => SessionConfig::default_path().filter(|path| path.is_file()),
        };
        let file = path.as_deref().map(SessionConfig::load).transpose()?;

        let credential = self.credential();
        let mut config = match (file, credential) {
            (Some(mut config), credential) => {
                if let Some(credential) = credential {
                    config.credential = credential;
                }
                config
            }
            (None, Some(credential)) => {
                let url = self.url.clone().ok_or_else(|| {
                    Error::Config("no service URL\n  hint: pass --url or --config".to_string())
                })?;
                SessionConfig::new(url, credential)
            }
            (None, None) => {
                return Err(Error::Config(
                    "no credentials\n  hint: pass --login/--password, --access-key or --config"
                        .to_string(),
                ))
            }
        };

        if let Some(url) = &self.url {
            config.service_url = url.clone();
        }
        if !self.channels.is_empty() {
            config.channels = self.channels.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn credential(&self) -> Option<Credential> {
        if let Some(key) = &self.access_key {
            return Some(Credential::access_key(key.clone()));
        }
        match (&self.login, &self.password) {
            (Some(login), Some(password)) => Some(Credential::basic(login.clone(), password.clone())),
            _ => None,
        }
    }

    /// Devices to subscribe to.
    pub fn subscription(&self) -> Devices {
        if self.devices.is_empty() {
            Devices::All
        } else {
            Devices::from(self.devices.clone())
        }
    }

    /// Parsed `--parameters`.
    pub fn command_parameters(&self) -> Result<Option<Value>> {
        self.parameters
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
