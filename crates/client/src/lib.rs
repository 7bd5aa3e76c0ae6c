// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! devicehive - Client-side channel layer for a DeviceHive server.
//!
//! A [`Session`] keeps one logical connection to the server and delivers
//! device notifications and command results to application callbacks. The
//! application never needs to know which transport is active.
//!
//! # Main Components
//!
//! - [`Session`] - Facade owning the channel state machine and the active channel
//! - [`channel`] - The [`Channel`] trait and its two implementations:
//!   [`SocketChannel`] (WebSocket, request/response correlation) and
//!   [`PollChannel`] (HTTP long polling with a timestamp cursor)
//! - [`http`] - The transport primitive every HTTP call goes through
//! - [`SessionConfig`] - TOML-backed session configuration
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use devicehive::{Credential, Session};
//!
//! let session = Session::builder("http://hive.example/api", Credential::basic("alice", "secret"))
//!     .build()?;
//! session.on_notification(|event| println!("{}: {}", event.device_id, event.notification.notification));
//! session.open_channel(None).await?;
//! session.subscribe("c73ccf23-8bf5-4c2c-b330-ead36f469d1a").await?;
//!
//! session
//!     .send_command("c73ccf23-8bf5-4c2c-b330-ead36f469d1a", "blink", None)
//!     .await?
//!     .result(|command| println!("executed: {:?}", command.status));
//! ```

pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod resources;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use auth::Credential;
pub use channel::{
    Channel, ChannelContext, ChannelFactory, ChannelKind, Devices, PollChannel, SentCommand,
    SocketChannel,
};
pub use config::SessionConfig;
pub use dh_core::{Command, DeviceNotification, Notification, ServerInfo, Timestamp};
pub use error::{Error, Result};
pub use events::{NotificationEvent, StateChange};
pub use http::{HttpError, HttpRequest, HttpTransport, Method, ReqwestTransport};
pub use resources::{CommandFilter, DeviceFilter, NetworkFilter, NotificationFilter, SortOrder};
pub use session::{ChannelState, Session, SessionBuilder};

use std::sync::{Mutex, MutexGuard};

/// Locks a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
