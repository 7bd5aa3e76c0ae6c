// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Application callbacks and the events delivered to them.

use std::sync::{Arc, Mutex};

use dh_core::Notification;

use crate::lock;
use crate::session::ChannelState;

/// A notification pushed by a device the session is subscribed to.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub device_id: String,
    pub notification: Notification,
}

/// A transition of the session's channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub old_state: ChannelState,
    pub new_state: ChannelState,
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An append-only list of callbacks.
///
/// Listeners are called in registration order. Emitting snapshots the list
/// first, so a listener may register further listeners without deadlocking.
pub(crate) struct Listeners<E> {
    inner: Mutex<Vec<Listener<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            inner: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub(crate) fn add(&self, listener: impl Fn(&E) + Send + Sync + 'static) {
        lock(&self.inner).push(Arc::new(listener));
    }

    pub(crate) fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = lock(&self.inner).clone();
        for listener in snapshot {
            listener(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).len()
    }
}

/// Upward edge from a channel to its owner.
///
/// A channel reports pushed notifications and an unexpected loss of its
/// connection through these hooks; it never sees the session itself.
#[derive(Clone)]
pub struct ChannelEvents {
    notify: Arc<dyn Fn(NotificationEvent) + Send + Sync>,
    disconnected: Arc<dyn Fn() + Send + Sync>,
}

impl ChannelEvents {
    pub fn new(
        notify: impl Fn(NotificationEvent) + Send + Sync + 'static,
        disconnected: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        ChannelEvents {
            notify: Arc::new(notify),
            disconnected: Arc::new(disconnected),
        }
    }

    /// Hooks that drop every event.
    pub fn detached() -> Self {
        Self::new(|_| {}, || {})
    }

    pub fn notification(&self, device_id: impl Into<String>, notification: Notification) {
        (self.notify)(NotificationEvent {
            device_id: device_id.into(),
            notification,
        });
    }

    pub fn disconnected(&self) {
        (self.disconnected)();
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
