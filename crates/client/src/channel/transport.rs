// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the socket channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - In-memory connections for unit testing
//!
//! A connection is split into a [`FrameSink`] and a [`FrameSource`] so the
//! channel can write requests while a reader task owns the inbound side.

use dh_core::protocol::{Request, ServerMessage};
use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Outbound half of a socket connection.
pub trait FrameSink: Send {
    /// Send one request frame.
    fn send(&mut self, request: Request) -> BoxFuture<'_, TransportResult<()>>;

    /// Close the connection.
    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>>;
}

/// Inbound half of a socket connection.
pub trait FrameSource: Send {
    /// Receive the next server frame.
    ///
    /// Returns `None` once the connection is closed.
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>>;
}

/// An open socket connection.
pub struct SocketConnection {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

/// Opens socket connections.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with in-memory implementations.
pub trait SocketConnector: Send + Sync {
    fn connect(&self, url: &str) -> BoxFuture<'_, TransportResult<SocketConnection>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector using tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        WebSocketConnector
    }
}

impl SocketConnector for WebSocketConnector {
    fn connect(&self, url: &str) -> BoxFuture<'_, TransportResult<SocketConnection>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            debug!(%url, "websocket connected");

            let (sink, stream) = ws_stream.split();
            Ok(SocketConnection {
                sink: Box::new(WebSocketSink { sink }),
                source: Box::new(WebSocketSource { stream }),
            })
        })
    }
}

struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

impl FrameSink for WebSocketSink {
    fn send(&mut self, request: Request) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let json = request
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            self.sink
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;

            // Flush so a broken connection is detected on this send
            self.sink
                .flush()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            self.sink
                .close()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }
}

struct WebSocketSource {
    stream: SplitStream<WsStream>,
}

impl FrameSource for WebSocketSource {
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let msg = ServerMessage::from_json(&text)
                            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
                        return Ok(Some(msg));
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(None),
                    // Ping/pong and binary frames carry nothing for us
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
