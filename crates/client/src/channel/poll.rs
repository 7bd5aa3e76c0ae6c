// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Poll channel: notifications over repeated HTTP long polls.
//!
//! A background task issues `GET /device/notification/poll` with a
//! timestamp cursor, delivers every notification in the response, advances
//! the cursor, and polls again. Subscribe and unsubscribe restart the task
//! so the next request reflects the new subscription at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dh_core::{Command, DeviceNotification, ServerInfo, Timestamp};
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{apply_assigned, Channel, ChannelContext, ChannelKind, Devices, SentCommand};
use crate::error::{Error, Result};
use crate::events::ChannelEvents;
use crate::http::{fetch, resource_path, HttpError, HttpRequest, HttpTransport};
use crate::lock;

/// Abort reason of a deliberately stopped poll; such a poll is not retried.
pub const STOP_REASON: &str = "The client stopped polling";

/// Delay before a failed poll is retried.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Long-poll endpoint for notifications of many devices.
pub const POLL_PATH: &str = "/device/notification/poll";

/// The devices the poll loop asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subscription {
    /// Every device; the request carries no device filter.
    #[default]
    All,
    /// Lower-cased device ids. Empty means polling is stopped.
    Devices(Vec<String>),
}

impl Subscription {
    pub fn subscribe(&mut self, devices: Devices) {
        match devices {
            Devices::All => *self = Subscription::All,
            Devices::Only(ids) => {
                if let Subscription::Devices(current) = self {
                    for id in ids {
                        let id = id.to_lowercase();
                        if !current.contains(&id) {
                            current.push(id);
                        }
                    }
                }
            }
        }
    }

    /// Removing ids from `All` is a no-op; only unsubscribing from all
    /// devices clears it.
    pub fn unsubscribe(&mut self, devices: Devices) {
        match devices {
            Devices::All => *self = Subscription::Devices(Vec::new()),
            Devices::Only(ids) => {
                if let Subscription::Devices(current) = self {
                    let ids: Vec<String> = ids.iter().map(|id| id.to_lowercase()).collect();
                    current.retain(|id| !ids.contains(id));
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Subscription::Devices(ids) if ids.is_empty())
    }

    /// Value of the `deviceGuids` query parameter; `None` for all devices.
    pub fn device_filter(&self) -> Option<String> {
        match self {
            Subscription::All => None,
            Subscription::Devices(ids) => Some(ids.join(",")),
        }
    }
}

/// State read by the running poll loop on every cycle.
#[derive(Default)]
struct PollState {
    subscription: Mutex<Subscription>,
    cursor: Mutex<Option<Timestamp>>,
}

struct Poller {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Channel over HTTP long polling.
pub struct PollChannel {
    context: ChannelContext,
    state: Arc<PollState>,
    poller: Mutex<Option<Poller>>,
    /// Serializes restarts so two subscribe calls cannot race two loops.
    restarting: tokio::sync::Mutex<()>,
}

impl PollChannel {
    pub fn new(context: ChannelContext) -> Self {
        PollChannel {
            context,
            state: Arc::new(PollState::default()),
            poller: Mutex::new(None),
            restarting: tokio::sync::Mutex::new(()),
        }
    }

    pub fn subscription(&self) -> Subscription {
        lock(&self.state.subscription).clone()
    }

    /// Timestamp of the newest notification already requested.
    pub fn cursor(&self) -> Option<Timestamp> {
        *lock(&self.state.cursor)
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.poller)
            .as_ref()
            .is_some_and(|poller| !poller.task.is_finished())
    }

    fn stop(&self) {
        if let Some(poller) = lock(&self.poller).take() {
            debug!(reason = STOP_REASON, "stopping poll loop");
            poller.token.cancel();
            poller.task.abort();
        }
    }

    async fn restart(&self) -> Result<()> {
        let _guard = self.restarting.lock().await;
        self.stop();

        if lock(&self.state.subscription).is_empty() {
            debug!("no devices subscribed, polling stopped");
            return Ok(());
        }

        let info: ServerInfo = fetch(&*self.context.http, HttpRequest::get("/info")).await?;
        let cursor = {
            let mut cursor = lock(&self.state.cursor);
            let seeded = match *cursor {
                Some(previous) if previous > info.server_timestamp => previous,
                _ => info.server_timestamp,
            };
            *cursor = Some(seeded);
            seeded
        };

        let token = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.context.http),
            Arc::clone(&self.state),
            self.context.events.clone(),
            token.clone(),
            self.context.poll_retry,
        ));
        *lock(&self.poller) = Some(Poller { token, task });
        info!(%cursor, "poll loop started");
        Ok(())
    }

    async fn update(&self, devices: Devices, subscribe: bool) -> Result<()> {
        {
            let mut subscription = lock(&self.state.subscription);
            if subscribe {
                subscription.subscribe(devices);
            } else {
                subscription.unsubscribe(devices);
            }
        }
        self.restart().await
    }

    async fn insert_command(&self, device_id: String, command: Command) -> Result<SentCommand> {
        let body = serde_json::to_value(&command)?;
        let assigned: Command = fetch(
            &*self.context.http,
            HttpRequest::post(resource_path(&["device", &device_id, "command"])?, body),
        )
        .await?;

        let mut inserted = command;
        apply_assigned(&mut inserted, assigned);

        let result: BoxFuture<'static, Result<Option<Command>>> = match inserted.id {
            Some(command_id) => {
                let http = Arc::clone(&self.context.http);
                let path =
                    resource_path(&["device", &device_id, "command", &command_id.to_string(), "poll"])?;
                Box::pin(async move {
                    let value = http.request(HttpRequest::get(path)).await?;
                    if is_empty_body(&value) {
                        return Ok(None);
                    }
                    Ok(Some(serde_json::from_value(value)?))
                })
            }
            None => Box::pin(async {
                Err(Error::UnexpectedResponse(
                    "command insert response carries no command id".into(),
                ))
            }),
        };
        Ok(SentCommand::new(inserted, result))
    }
}

fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parses one poll response; `null` or an empty body is an empty batch.
///
/// Elements are decoded one by one so a malformed entry is skipped without
/// holding back the rest of the batch.
fn parse_batch(value: Value) -> std::result::Result<Vec<DeviceNotification>, HttpError> {
    if is_empty_body(&value) {
        return Ok(Vec::new());
    }
    let Value::Array(items) = value else {
        return Err(HttpError::Decode(format!(
            "expected a notification array, got {}",
            value
        )));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(notification) => Some(notification),
            Err(e) => {
                warn!(error = %e, "skipping malformed notification in poll batch");
                None
            }
        })
        .collect())
}

fn poll_request(state: &PollState) -> HttpRequest {
    let mut request = HttpRequest::get(POLL_PATH);
    if let Some(cursor) = *lock(&state.cursor) {
        request = request.with_query("timestamp", cursor.to_string());
    }
    if let Some(devices) = lock(&state.subscription).device_filter() {
        request = request.with_query("deviceGuids", devices);
    }
    request
}

async fn poll_loop(
    http: Arc<dyn HttpTransport>,
    state: Arc<PollState>,
    events: ChannelEvents,
    token: CancellationToken,
    retry: Duration,
) {
    while !token.is_cancelled() {
        let request = poll_request(&state);
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(HttpError::Transport(STOP_REASON.to_string())),
            outcome = http.request(request) => outcome,
        };

        let batch = match outcome.and_then(parse_batch) {
            Ok(batch) => batch,
            Err(HttpError::Transport(reason)) if reason == STOP_REASON => break,
            Err(e) => {
                warn!(error = %e, retry_ms = retry.as_millis() as u64, "poll failed, retrying");
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(retry) => {}
                }
                continue;
            }
        };

        let mut newest: Option<Timestamp> = None;
        for item in batch {
            if token.is_cancelled() {
                break;
            }
            if let Some(timestamp) = item.notification.timestamp {
                newest = Some(newest.map_or(timestamp, |n| n.max(timestamp)));
            }
            events.notification(item.device_guid, item.notification);
        }

        if let Some(newest) = newest {
            let mut cursor = lock(&state.cursor);
            if cursor.map_or(true, |c| newest > c) {
                debug!(cursor = %newest, "poll cursor advanced");
                *cursor = Some(newest);
            }
        }
    }
    debug!(reason = STOP_REASON, "poll loop ended");
}

impl Channel for PollChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::LongPolling
    }

    fn open(&self) -> BoxFuture<'_, Result<()>> {
        // Connectivity is established by the first subscription
        Box::pin(async { Ok(()) })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let _guard = self.restarting.lock().await;
            self.stop();
        })
    }

    fn subscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.update(devices, true))
    }

    fn unsubscribe(&self, devices: Devices) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.update(devices, false))
    }

    fn send_command(
        &self,
        device_id: String,
        command: Command,
    ) -> BoxFuture<'_, Result<SentCommand>> {
        Box::pin(self.insert_command(device_id, command))
    }
}

impl Drop for PollChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
