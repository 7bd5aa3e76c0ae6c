// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Interchangeable transports behind one interface.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │   Session   │────►│  dyn Channel     │────►│   Server    │
//! │  (facade)   │◄────│ socket | poll    │◄────│             │
//! └─────────────┘     └──────────────────┘     └─────────────┘
//!        ▲                     │
//!        └── ChannelEvents ────┘   (notifications, disconnect)
//! ```
//!
//! The session creates channels through a [`ChannelFactory`] and only talks
//! to them through the [`Channel`] trait. Channels report back through the
//! [`ChannelEvents`] hooks in their [`ChannelContext`].

mod poll;
mod socket;
mod transport;

pub use poll::{PollChannel, Subscription, DEFAULT_RETRY_DELAY, POLL_PATH, STOP_REASON};
pub use socket::{SocketChannel, DEFAULT_REQUEST_TIMEOUT};
pub use transport::{
    FrameSink, FrameSource, SocketConnection, SocketConnector, TransportError, TransportResult,
    WebSocketConnector,
};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dh_core::{Command, ServerInfo};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::auth::Credential;
use crate::error::{Error, Result};
use crate::events::ChannelEvents;
use crate::http::HttpTransport;

/// The channel implementations a session can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Persistent bidirectional socket.
    WebSocket,
    /// HTTP long polling.
    LongPolling,
}

impl ChannelKind {
    /// Default preference order.
    pub const ALL: [ChannelKind; 2] = [ChannelKind::WebSocket, ChannelKind::LongPolling];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::WebSocket => "websocket",
            ChannelKind::LongPolling => "longpolling",
        }
    }

    /// The built-in implementation of this kind.
    pub fn factory(&self) -> Arc<dyn ChannelFactory> {
        match self {
            ChannelKind::WebSocket => {
                Arc::new(|ctx: ChannelContext| Arc::new(SocketChannel::new(ctx)) as Arc<dyn Channel>)
            }
            ChannelKind::LongPolling => {
                Arc::new(|ctx: ChannelContext| Arc::new(PollChannel::new(ctx)) as Arc<dyn Channel>)
            }
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "websocket" | "ws" | "socket" => Ok(ChannelKind::WebSocket),
            "longpolling" | "long-polling" | "poll" => Ok(ChannelKind::LongPolling),
            other => Err(Error::Config(format!(
                "unknown channel '{}'\n  hint: use 'websocket' or 'longpolling'",
                other
            ))),
        }
    }
}

/// Which devices a subscribe or unsubscribe call names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Devices {
    /// Every device visible to the credential.
    #[default]
    All,
    /// An explicit list of device ids.
    Only(Vec<String>),
}

impl Devices {
    /// `None` for all devices.
    pub fn into_ids(self) -> Option<Vec<String>> {
        match self {
            Devices::All => None,
            Devices::Only(ids) => Some(ids),
        }
    }
}

impl From<&str> for Devices {
    fn from(id: &str) -> Self {
        Devices::Only(vec![id.to_string()])
    }
}

impl From<String> for Devices {
    fn from(id: String) -> Self {
        Devices::Only(vec![id])
    }
}

impl From<Vec<String>> for Devices {
    fn from(ids: Vec<String>) -> Self {
        Devices::Only(ids)
    }
}

impl From<Vec<&str>> for Devices {
    fn from(ids: Vec<&str>) -> Self {
        Devices::Only(ids.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Devices {
    fn from(ids: &[&str]) -> Self {
        Devices::Only(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl From<Option<Vec<String>>> for Devices {
    fn from(ids: Option<Vec<String>>) -> Self {
        ids.map_or(Devices::All, Devices::Only)
    }
}

/// Everything a channel needs from its session.
#[derive(Clone)]
pub struct ChannelContext {
    pub http: Arc<dyn HttpTransport>,
    /// Server metadata fetched by the session before opening.
    pub server_info: ServerInfo,
    pub credential: Credential,
    /// `None` when the runtime has no socket capability.
    pub connector: Option<Arc<dyn SocketConnector>>,
    pub events: ChannelEvents,
    /// Deadline for one socket request.
    pub request_timeout: Duration,
    /// Delay before a failed poll is retried.
    pub poll_retry: Duration,
}

/// A transport implementation the session can activate.
///
/// All methods take `&self`; implementations keep their own state behind
/// interior mutability so the session can share the active channel.
pub trait Channel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Establish connectivity. A failure lets the session fall back to the
    /// next candidate.
    fn open(&self) -> BoxFuture<'_, Result<()>>;

    /// Tear down connectivity. Never fails.
    fn close(&self) -> BoxFuture<'_, ()>;

    fn subscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>>;

    fn unsubscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>>;

    /// Insert `command` for `device_id`.
    fn send_command(&self, device_id: String, command: Command)
        -> BoxFuture<'_, Result<SentCommand>>;
}

/// Creates channel instances for a session.
pub trait ChannelFactory: Send + Sync {
    fn create(&self, context: ChannelContext) -> Arc<dyn Channel>;
}

impl<F> ChannelFactory for F
where
    F: Fn(ChannelContext) -> Arc<dyn Channel> + Send + Sync,
{
    fn create(&self, context: ChannelContext) -> Arc<dyn Channel> {
        self(context)
    }
}

/// A command accepted by the server, with its eventual result.
pub struct SentCommand {
    command: Command,
    result: BoxFuture<'static, Result<Option<Command>>>,
}

impl SentCommand {
    /// `result` resolves with the executed command, or `None` when the
    /// server reports no result.
    pub fn new(command: Command, result: BoxFuture<'static, Result<Option<Command>>>) -> Self {
        SentCommand { command, result }
    }

    /// The command as inserted, including the server-assigned id.
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn id(&self) -> Option<u64> {
        self.command.id
    }

    /// Waits for the command's execution result.
    pub async fn wait(self) -> Result<Option<Command>> {
        self.result.await
    }

    /// Calls `callback` once with the executed command.
    ///
    /// The callback is never called if no result arrives or the wait fails.
    pub fn result<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Command) + Send + 'static,
    {
        let id = self.command.id;
        tokio::spawn(async move {
            match self.result.await {
                Ok(Some(command)) => callback(command),
                Ok(None) => debug!(command_id = ?id, "command finished without a result"),
                Err(e) => debug!(command_id = ?id, error = %e, "command result unavailable"),
            }
        })
    }
}

impl fmt::Debug for SentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentCommand")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Copies the fields the server assigned on insert into `command`.
pub(crate) fn apply_assigned(command: &mut Command, assigned: Command) {
    command.id = assigned.id.or(command.id);
    command.timestamp = assigned.timestamp.or(command.timestamp);
    command.user_id = assigned.user_id.or(command.user_id);
    if assigned.status.is_some() {
        command.status = assigned.status;
    }
    if assigned.result.is_some() {
        command.result = assigned.result;
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
