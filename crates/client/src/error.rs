// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::channel::TransportError;
use crate::http::HttpError;

/// All possible errors that can occur in the devicehive library.
///
/// Every message starts with `DeviceHive` so failures surfaced to end users
/// identify where they came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("DeviceHive: Channel is not opened\n  hint: call open_channel() first")]
    NotConnected,

    #[error("DeviceHive: Channel has not been initialized\n  hint: wait for open_channel() to complete before using the channel")]
    StillConnecting,

    #[error("DeviceHive: None of the specified channels are supported")]
    NoSupportedChannel,

    #[error("DeviceHive: Channel was closed while it was being opened")]
    OpenAborted,

    #[error("DeviceHive: The server does not support WebSocket API")]
    SocketNotAdvertised,

    #[error("DeviceHive: The runtime does not support WebSocket\n  hint: configure a socket connector on the session builder")]
    SocketUnavailable,

    #[error("DeviceHive: WebSocket connection has failed to open: {0}")]
    SocketOpenFailed(#[source] TransportError),

    #[error("DeviceHive: WebSocket {0}")]
    Transport(#[from] TransportError),

    #[error("DeviceHive server error - {0}")]
    Http(#[from] HttpError),

    #[error("DeviceHive: {0}")]
    Server(String),

    #[error("DeviceHive: Operation timeout (request {request_id})")]
    Timeout { request_id: u64 },

    #[error("DeviceHive: Channel closed before a response arrived")]
    ChannelClosed,

    #[error("DeviceHive: unexpected server response: {0}")]
    UnexpectedResponse(String),

    #[error("DeviceHive: {0}")]
    Core(#[from] dh_core::Error),

    #[error("DeviceHive: json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DeviceHive: config error: {0}")]
    Config(String),

    #[error("DeviceHive: io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for devicehive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
