// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session facade and channel state machine.
//!
//! The session owns the channel state and the active channel. It negotiates
//! which channel to activate by trying candidates in order, then delegates
//! subscribe, unsubscribe and send_command to whichever one won.
//!
//! ```text
//!                open_channel()
//! Disconnected ───────────────► Connecting
//!      ▲   ▲                        │
//!      │   └── all candidates fail ─┤
//!      │                            │ a candidate opened
//!      │  close_channel() or        ▼
//!      └─── connection lost ──── Connected
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dh_core::{Command, ServerInfo};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::Credential;
use crate::channel::{
    Channel, ChannelContext, ChannelFactory, ChannelKind, Devices, SentCommand, SocketConnector,
    WebSocketConnector, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY,
};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::events::{ChannelEvents, Listeners, NotificationEvent, StateChange};
use crate::http::{fetch, HttpRequest, HttpTransport, ReqwestTransport};
use crate::lock;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
        })
    }
}

struct ActiveChannel {
    /// Identifies the open attempt that created the channel, so events from
    /// a replaced channel are recognized as stale.
    generation: u64,
    kind: ChannelKind,
    channel: Arc<dyn Channel>,
}

struct Current {
    state: ChannelState,
    active: Option<ActiveChannel>,
}

struct Inner {
    service_url: String,
    credential: Credential,
    http: Arc<dyn HttpTransport>,
    connector: Option<Arc<dyn SocketConnector>>,
    /// Registered implementations in preference order.
    factories: Vec<(ChannelKind, Arc<dyn ChannelFactory>)>,
    request_timeout: Duration,
    poll_retry: Duration,
    server_info: Mutex<Option<ServerInfo>>,
    current: Mutex<Current>,
    generation: AtomicU64,
    notification_listeners: Listeners<NotificationEvent>,
    state_listeners: Listeners<StateChange>,
}

impl Inner {
    /// Moves from `expected` to `new` if `apply` agrees.
    ///
    /// `apply` runs under the state lock and only when the current state is
    /// `expected`. The state-changed event is emitted after the lock is
    /// released.
    fn transition_if(
        &self,
        expected: ChannelState,
        new: ChannelState,
        apply: impl FnOnce(&mut Current) -> bool,
    ) -> bool {
        let applied = {
            let mut current = lock(&self.current);
            if current.state == expected && apply(&mut current) {
                current.state = new;
                true
            } else {
                false
            }
        };
        if applied {
            debug!(old = %expected, new = %new, "channel state changed");
            self.state_listeners.emit(&StateChange {
                old_state: expected,
                new_state: new,
            });
        }
        applied
    }

    fn transition(&self, expected: ChannelState, new: ChannelState) -> bool {
        self.transition_if(expected, new, |_| true)
    }

    fn is_active(&self, generation: u64) -> bool {
        lock(&self.current)
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn factory(&self, kind: ChannelKind) -> Option<Arc<dyn ChannelFactory>> {
        self.factories
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, factory)| Arc::clone(factory))
    }

    fn channel_notification(&self, generation: u64, event: NotificationEvent) {
        if self.is_active(generation) {
            self.notification_listeners.emit(&event);
        } else {
            debug!(generation, device_id = %event.device_id, "dropping notification from inactive channel");
        }
    }

    fn channel_lost(&self, generation: u64) {
        let applied = self.transition_if(
            ChannelState::Connected,
            ChannelState::Disconnected,
            |current| {
                current
                    .active
                    .as_ref()
                    .is_some_and(|active| active.generation == generation)
            },
        );
        if applied {
            warn!(generation, "active channel disconnected");
        }
    }

    fn context(self: &Arc<Self>, server_info: ServerInfo, generation: u64) -> ChannelContext {
        let notify: Weak<Inner> = Arc::downgrade(self);
        let lost: Weak<Inner> = Arc::downgrade(self);
        ChannelContext {
            http: Arc::clone(&self.http),
            server_info,
            credential: self.credential.clone(),
            connector: self.connector.clone(),
            events: ChannelEvents::new(
                move |event| {
                    if let Some(inner) = notify.upgrade() {
                        inner.channel_notification(generation, event);
                    }
                },
                move || {
                    if let Some(inner) = lost.upgrade() {
                        inner.channel_lost(generation);
                    }
                },
            ),
            request_timeout: self.request_timeout,
            poll_retry: self.poll_retry,
        }
    }

    async fn info(&self) -> Result<ServerInfo> {
        if let Some(info) = lock(&self.server_info).clone() {
            return Ok(info);
        }
        let info: ServerInfo = fetch(&*self.http, HttpRequest::get("/info")).await?;
        debug!(api_version = ?info.api_version, server_timestamp = %info.server_timestamp, "server info fetched");
        *lock(&self.server_info) = Some(info.clone());
        Ok(info)
    }
}

/// One logical connection to a DeviceHive server.
///
/// Cloning is cheap; clones share the same channel and listeners.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Starts building a session for the service at `service_url`.
    pub fn builder(service_url: impl Into<String>, credential: Credential) -> SessionBuilder {
        SessionBuilder::new(service_url, credential)
    }

    /// Creates a session with the default transports and channels.
    pub fn new(service_url: impl Into<String>, credential: Credential) -> Result<Self> {
        Self::builder(service_url, credential).build()
    }

    /// Creates a session from a loaded configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder(config.service_url.clone(), config.credential.clone())
            .channels(&config.channels)
            .request_timeout(config.request_timeout())
            .poll_retry(config.poll_retry());
        if let Some(timeout) = config.http_timeout() {
            builder = builder.http_timeout(timeout);
        }
        builder.build()
    }

    pub fn service_url(&self) -> &str {
        &self.inner.service_url
    }

    pub fn state(&self) -> ChannelState {
        lock(&self.inner.current).state
    }

    /// Kind of the active channel, if connected.
    pub fn active_kind(&self) -> Option<ChannelKind> {
        let current = lock(&self.inner.current);
        match current.state {
            ChannelState::Connected => current.active.as_ref().map(|active| active.kind),
            _ => None,
        }
    }

    /// Server metadata cached by the first successful fetch.
    pub fn server_info(&self) -> Option<ServerInfo> {
        lock(&self.inner.server_info).clone()
    }

    /// Returns server metadata, fetching `GET /info` on first use.
    pub async fn info(&self) -> Result<ServerInfo> {
        self.inner.info().await
    }

    /// Registers a listener for device notifications.
    pub fn on_notification(&self, listener: impl Fn(&NotificationEvent) + Send + Sync + 'static) {
        self.inner.notification_listeners.add(listener);
    }

    /// Registers a listener for channel state changes.
    pub fn on_state_changed(&self, listener: impl Fn(&StateChange) + Send + Sync + 'static) {
        self.inner.state_listeners.add(listener);
    }

    /// Opens a channel, trying `candidates` in order.
    ///
    /// `None` tries every registered channel in registration order. Resolves
    /// immediately if the session is already connecting or connected.
    pub async fn open_channel(&self, candidates: Option<&[ChannelKind]>) -> Result<()> {
        let inner = &self.inner;
        if !inner.transition(ChannelState::Disconnected, ChannelState::Connecting) {
            debug!(state = %self.state(), "channel already opening or open");
            return Ok(());
        }

        // A channel that lost its connection stays until the next open
        let stale = lock(&inner.current).active.take();
        if let Some(stale) = stale {
            stale.channel.close().await;
        }

        let server_info = match inner.info().await {
            Ok(info) => info,
            Err(e) => {
                inner.transition(ChannelState::Connecting, ChannelState::Disconnected);
                return Err(e);
            }
        };

        let kinds: Vec<ChannelKind> = match candidates {
            Some(kinds) => kinds.to_vec(),
            None => inner.factories.iter().map(|(kind, _)| *kind).collect(),
        };

        for kind in kinds {
            if self.state() != ChannelState::Connecting {
                return Err(Error::OpenAborted);
            }
            let Some(factory) = inner.factory(kind) else {
                debug!(%kind, "channel not registered, skipping");
                continue;
            };

            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let channel = factory.create(inner.context(server_info.clone(), generation));
            debug!(%kind, generation, "trying channel");

            match channel.open().await {
                Ok(()) => {
                    let adopted = inner.transition_if(
                        ChannelState::Connecting,
                        ChannelState::Connected,
                        |current| {
                            current.active = Some(ActiveChannel {
                                generation,
                                kind,
                                channel: Arc::clone(&channel),
                            });
                            true
                        },
                    );
                    if !adopted {
                        channel.close().await;
                        return Err(Error::OpenAborted);
                    }
                    info!(%kind, "channel connected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(%kind, error = %e, "channel failed to open");
                    channel.close().await;
                }
            }
        }

        inner.transition(ChannelState::Connecting, ChannelState::Disconnected);
        Err(Error::NoSupportedChannel)
    }

    /// Closes the active channel. Does nothing when already disconnected.
    pub async fn close_channel(&self) {
        let (old_state, active) = {
            let mut current = lock(&self.inner.current);
            if current.state == ChannelState::Disconnected {
                return;
            }
            let old_state = current.state;
            current.state = ChannelState::Disconnected;
            (old_state, current.active.take())
        };

        if let Some(active) = active {
            debug!(kind = %active.kind, "closing channel");
            active.channel.close().await;
        }
        info!("channel closed");
        self.inner.state_listeners.emit(&StateChange {
            old_state,
            new_state: ChannelState::Disconnected,
        });
    }

    fn active_channel(&self) -> Result<Arc<dyn Channel>> {
        let current = lock(&self.inner.current);
        match current.state {
            ChannelState::Disconnected => Err(Error::NotConnected),
            ChannelState::Connecting => Err(Error::StillConnecting),
            ChannelState::Connected => current
                .active
                .as_ref()
                .map(|active| Arc::clone(&active.channel))
                .ok_or(Error::NotConnected),
        }
    }

    /// Subscribes to notifications of `devices`; [`Devices::All`] for every
    /// device.
    pub async fn subscribe(&self, devices: impl Into<Devices>) -> Result<()> {
        let channel = self.active_channel()?;
        channel.subscribe(devices.into()).await
    }

    pub async fn unsubscribe(&self, devices: impl Into<Devices>) -> Result<()> {
        let channel = self.active_channel()?;
        channel.unsubscribe(devices.into()).await
    }

    /// Sends command `name` to `device_id`.
    ///
    /// The returned [`SentCommand`] carries the server-assigned id and lets
    /// the caller wait for the execution result.
    pub async fn send_command(
        &self,
        device_id: impl Into<String>,
        name: impl Into<String>,
        parameters: Option<Value>,
    ) -> Result<SentCommand> {
        let channel = self.active_channel()?;
        channel
            .send_command(device_id.into(), Command::new(name, parameters))
            .await
    }

    pub(crate) fn http(&self) -> &dyn HttpTransport {
        &*self.inner.http
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    service_url: String,
    credential: Credential,
    http: Option<Arc<dyn HttpTransport>>,
    connector: Option<Arc<dyn SocketConnector>>,
    factories: Vec<(ChannelKind, Arc<dyn ChannelFactory>)>,
    request_timeout: Duration,
    poll_retry: Duration,
    http_timeout: Option<Duration>,
}

impl SessionBuilder {
    pub fn new(service_url: impl Into<String>, credential: Credential) -> Self {
        SessionBuilder {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            credential,
            http: None,
            connector: Some(Arc::new(WebSocketConnector::new())),
            factories: ChannelKind::ALL
                .iter()
                .map(|kind| (*kind, kind.factory()))
                .collect(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_retry: DEFAULT_RETRY_DELAY,
            http_timeout: None,
        }
    }

    /// Replaces the reqwest transport.
    pub fn http_transport(mut self, http: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn socket_connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds a session whose runtime has no socket capability.
    pub fn without_socket(mut self) -> Self {
        self.connector = None;
        self
    }

    /// Registers `factory` for `kind`, replacing an earlier registration of
    /// the same kind in place.
    pub fn channel(mut self, kind: ChannelKind, factory: Arc<dyn ChannelFactory>) -> Self {
        match self.factories.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((kind, factory)),
        }
        self
    }

    /// Registers exactly the built-in `kinds`, in this order.
    pub fn channels(mut self, kinds: &[ChannelKind]) -> Self {
        self.factories = Vec::new();
        for kind in kinds {
            if !self.factories.iter().any(|(k, _)| k == kind) {
                self.factories.push((*kind, kind.factory()));
            }
        }
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn poll_retry(mut self, delay: Duration) -> Self {
        self.poll_retry = delay;
        self
    }

    /// Overall timeout of one reqwest call. Unset by default so long polls
    /// are bounded only by the server.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Session> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestTransport::new(
                self.service_url.clone(),
                self.credential.clone(),
                self.http_timeout,
            )?),
        };
        Ok(Session {
            inner: Arc::new(Inner {
                service_url: self.service_url,
                credential: self.credential,
                http,
                connector: self.connector,
                factories: self.factories,
                request_timeout: self.request_timeout,
                poll_retry: self.poll_retry,
                server_info: Mutex::new(None),
                current: Mutex::new(Current {
                    state: ChannelState::Disconnected,
                    active: None,
                }),
                generation: AtomicU64::new(0),
                notification_listeners: Listeners::default(),
                state_listeners: Listeners::default(),
            }),
        })
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
