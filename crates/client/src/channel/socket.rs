// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket channel: request/response correlation over one connection.
//!
//! Every outbound frame carries a fresh `requestId`. A reader task owns the
//! inbound half and settles the matching pending request when the response
//! arrives. Pushed `command/update` and `notification/insert` frames are
//! routed independently of any correlation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dh_core::protocol::{ClientMessage, Request, ServerMessage};
use dh_core::Command;
use futures_util::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::transport::{FrameSink, FrameSource, TransportError};
use super::{apply_assigned, Channel, ChannelContext, ChannelKind, Devices, SentCommand};
use crate::error::{Error, Result};
use crate::events::ChannelEvents;
use crate::lock;

/// Deadline for a single socket request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A settled response, plus the command-result receiver registered for a
/// successful `command/insert`.
struct Reply {
    message: ServerMessage,
    command_result: Option<oneshot::Receiver<Command>>,
}

struct PendingRequest {
    reply: oneshot::Sender<Result<Reply>>,
    /// Set for `command/insert`; the reader registers the command result
    /// before settling so an early `command/update` is not lost.
    expects_command: bool,
}

/// State shared between the channel and its reader task.
struct Shared {
    pending: Mutex<HashMap<u64, PendingRequest>>,
    command_results: Mutex<HashMap<u64, oneshot::Sender<Command>>>,
    events: ChannelEvents,
    /// Set once the handshake succeeded.
    opened: AtomicBool,
    /// Set by an explicit close; suppresses the disconnect report.
    closing: AtomicBool,
    /// Cleared when the reader task ends.
    alive: AtomicBool,
}

impl Shared {
    fn dispatch(&self, message: ServerMessage) {
        if let Some(request_id) = message.request_id {
            let pending = lock(&self.pending).remove(&request_id);
            match pending {
                Some(pending) => self.settle(request_id, pending, &message),
                None => debug!(request_id, "response for unknown or expired request"),
            }
        }

        if let Some((command_id, command)) = message.updated_command() {
            let waiter = lock(&self.command_results).remove(&command_id);
            if let Some(waiter) = waiter {
                debug!(command_id, "command result delivered");
                let _ = waiter.send(command.clone());
            }
        }

        if let Some((device_id, notification)) = message.inserted_notification() {
            self.events.notification(device_id, notification.clone());
        }
    }

    fn settle(&self, request_id: u64, pending: PendingRequest, message: &ServerMessage) {
        if !message.is_success() {
            let _ = pending
                .reply
                .send(Err(Error::Server(message.error_message())));
            return;
        }

        let mut registered = None;
        let mut command_result = None;
        if pending.expects_command {
            if let Some(command_id) = message.command.as_ref().and_then(|c| c.id) {
                let (tx, rx) = oneshot::channel();
                lock(&self.command_results).insert(command_id, tx);
                registered = Some(command_id);
                command_result = Some(rx);
            }
        }

        let reply = Reply {
            message: message.clone(),
            command_result,
        };
        if pending.reply.send(Ok(reply)).is_err() {
            // Waiter is gone; nobody can observe the result
            debug!(request_id, "response arrived after the caller gave up");
            if let Some(command_id) = registered {
                lock(&self.command_results).remove(&command_id);
            }
        }
    }

    /// Fails everything waiting on a connection that is gone.
    fn drain(&self) {
        let pending: Vec<_> = lock(&self.pending).drain().collect();
        for (_, request) in pending {
            let _ = request.reply.send(Err(Error::ChannelClosed));
        }
        lock(&self.command_results).clear();
    }
}

/// Removes a pending entry when its request times out or is dropped.
struct PendingSlot<'a> {
    shared: &'a Shared,
    request_id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        lock(&self.shared.pending).remove(&self.request_id);
    }
}

async fn read_loop(shared: Arc<Shared>, mut source: Box<dyn FrameSource>) {
    loop {
        match source.recv().await {
            Ok(Some(message)) => shared.dispatch(message),
            Ok(None) => {
                debug!("socket closed by server");
                break;
            }
            Err(TransportError::SerializationError(e)) => {
                warn!(error = %e, "ignoring malformed frame");
            }
            Err(e) => {
                warn!(error = %e, "socket receive failed");
                break;
            }
        }
    }

    shared.alive.store(false, Ordering::SeqCst);
    shared.drain();
    if shared.opened.load(Ordering::SeqCst) && !shared.closing.load(Ordering::SeqCst) {
        info!("socket channel lost its connection");
        shared.events.disconnected();
    }
}

/// Channel over a persistent bidirectional socket.
pub struct SocketChannel {
    context: ChannelContext,
    shared: Arc<Shared>,
    next_request_id: AtomicU64,
    sink: tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SocketChannel {
    pub fn new(context: ChannelContext) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            command_results: Mutex::new(HashMap::new()),
            events: context.events.clone(),
            opened: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            alive: AtomicBool::new(false),
        });
        SocketChannel {
            context,
            shared,
            next_request_id: AtomicU64::new(0),
            sink: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    /// Number of requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Number of commands whose result has not arrived yet.
    pub fn pending_command_results(&self) -> usize {
        lock(&self.shared.command_results).len()
    }

    /// Sends `message` and waits for the correlated response.
    async fn request(&self, message: ClientMessage) -> Result<Reply> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let expects_command = matches!(message, ClientMessage::CommandInsert { .. });
        let (tx, rx) = oneshot::channel();
        lock(&self.shared.pending).insert(
            request_id,
            PendingRequest {
                reply: tx,
                expects_command,
            },
        );
        let _slot = PendingSlot {
            shared: &self.shared,
            request_id,
        };

        let exchange = async move {
            {
                let mut sink = self.sink.lock().await;
                let sink = sink
                    .as_mut()
                    .ok_or(Error::Transport(TransportError::ConnectionClosed))?;
                debug!(request_id, action = message.action(), "socket request");
                sink.send(Request::new(request_id, message)).await?;
            }
            rx.await.map_err(|_| Error::ChannelClosed)?
        };

        match tokio::time::timeout(self.context.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(request_id, "socket request timed out");
                Err(Error::Timeout { request_id })
            }
        }
    }

    async fn connect(&self) -> Result<()> {
        let endpoint = self
            .context
            .server_info
            .web_socket_server_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(Error::SocketNotAdvertised)?;
        let connector = self
            .context
            .connector
            .clone()
            .ok_or(Error::SocketUnavailable)?;
        let url = format!("{}/client", endpoint.trim_end_matches('/'));

        debug!(%url, "opening socket channel");
        let connection = connector
            .connect(&url)
            .await
            .map_err(Error::SocketOpenFailed)?;

        *self.sink.lock().await = Some(connection.sink);
        self.shared.alive.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(Arc::clone(&self.shared), connection.source));
        if let Some(previous) = lock(&self.reader).replace(reader) {
            previous.abort();
        }

        let handshake = self.context.credential.authenticate_message();
        if let Err(e) = self.request(handshake).await {
            warn!(error = %e, "socket handshake failed");
            self.teardown().await;
            return Err(e);
        }

        self.shared.opened.store(true, Ordering::SeqCst);
        if !self.shared.alive.load(Ordering::SeqCst) {
            // Lost between the handshake reply and now
            self.teardown().await;
            return Err(Error::Transport(TransportError::ConnectionClosed));
        }
        info!(%url, "socket channel opened");
        Ok(())
    }

    async fn teardown(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "error closing socket");
            }
        }
    }

    async fn insert_command(&self, device_id: String, command: Command) -> Result<SentCommand> {
        let reply = self
            .request(ClientMessage::command_insert(device_id, command.clone()))
            .await?;

        let mut inserted = command;
        if let Some(assigned) = reply.message.command {
            apply_assigned(&mut inserted, assigned);
        }

        let result: BoxFuture<'static, Result<Option<Command>>> = match reply.command_result {
            Some(rx) => Box::pin(async move { rx.await.map(Some).map_err(|_| Error::ChannelClosed) }),
            None => Box::pin(async {
                Err(Error::UnexpectedResponse(
                    "command/insert response carries no command id".into(),
                ))
            }),
        };
        Ok(SentCommand::new(inserted, result))
    }
}

impl Channel for SocketChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WebSocket
    }

    fn open(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.connect())
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            debug!("closing socket channel");
            self.teardown().await;
        })
    }

    fn subscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.request(ClientMessage::subscribe(devices.into_ids()))
                .await
                .map(|_| ())
        })
    }

    fn unsubscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.request(ClientMessage::unsubscribe(devices.into_ids()))
                .await
                .map(|_| ())
        })
    }

    fn send_command(
        &self,
        device_id: String,
        command: Command,
    ) -> BoxFuture<'_, Result<SentCommand>> {
        Box::pin(self.insert_command(device_id, command))
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
