// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol frames for client-server communication.
//!
//! The protocol is simple:
//! - Client sends actions, each tagged with a fresh `requestId`
//! - Server answers each action with a frame echoing that `requestId`
//! - Server pushes `notification/insert` and `command/update` events unprompted

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Command, Notification};

/// Action name of a pushed device notification.
pub const NOTIFICATION_INSERT: &str = "notification/insert";

/// Action name of a pushed command status change.
pub const COMMAND_UPDATE: &str = "command/update";

/// Actions sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action")]
pub enum ClientMessage {
    /// Handshake; must be the first action on a fresh connection.
    #[serde(rename = "authenticate", rename_all = "camelCase")]
    Authenticate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        login: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key: Option<String>,
    },

    /// Start receiving notifications. No ids means all devices.
    #[serde(rename = "notification/subscribe", rename_all = "camelCase")]
    NotificationSubscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_guids: Option<Vec<String>>,
    },

    /// Stop receiving notifications. No ids means all devices.
    #[serde(rename = "notification/unsubscribe", rename_all = "camelCase")]
    NotificationUnsubscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_guids: Option<Vec<String>>,
    },

    /// Insert a command for a device.
    #[serde(rename = "command/insert", rename_all = "camelCase")]
    CommandInsert { device_guid: String, command: Command },
}

impl ClientMessage {
    /// Creates a login/password Authenticate message.
    pub fn authenticate(login: impl Into<String>, password: impl Into<String>) -> Self {
        ClientMessage::Authenticate {
            login: Some(login.into()),
            password: Some(password.into()),
            access_key: None,
        }
    }

    /// Creates an access-key Authenticate message.
    pub fn authenticate_key(access_key: impl Into<String>) -> Self {
        ClientMessage::Authenticate {
            login: None,
            password: None,
            access_key: Some(access_key.into()),
        }
    }

    /// Creates a NotificationSubscribe message.
    pub fn subscribe(device_guids: Option<Vec<String>>) -> Self {
        ClientMessage::NotificationSubscribe { device_guids }
    }

    /// Creates a NotificationUnsubscribe message.
    pub fn unsubscribe(device_guids: Option<Vec<String>>) -> Self {
        ClientMessage::NotificationUnsubscribe { device_guids }
    }

    /// Creates a CommandInsert message.
    pub fn command_insert(device_guid: impl Into<String>, command: Command) -> Self {
        ClientMessage::CommandInsert {
            device_guid: device_guid.into(),
            command,
        }
    }

    /// The wire name of this action.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Authenticate { .. } => "authenticate",
            ClientMessage::NotificationSubscribe { .. } => "notification/subscribe",
            ClientMessage::NotificationUnsubscribe { .. } => "notification/unsubscribe",
            ClientMessage::CommandInsert { .. } => "command/insert",
        }
    }
}

/// An outbound frame: an action plus its correlation id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: u64,
    #[serde(flatten)]
    pub message: ClientMessage,
}

impl Request {
    /// Tags a message with its correlation id.
    pub fn new(request_id: u64, message: ClientMessage) -> Self {
        Request {
            request_id,
            message,
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A frame sent from server to client.
///
/// A single frame may be a response (it carries a `requestId`), an event
/// (it carries an `action`), or both, so every part is optional and callers
/// inspect each independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    /// `success` or `error` on responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    /// Action-specific payload fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerMessage {
    /// Creates a successful response.
    pub fn success(request_id: u64) -> Self {
        ServerMessage {
            request_id: Some(request_id),
            status: Some("success".to_string()),
            ..Default::default()
        }
    }

    /// Creates a failed response.
    pub fn failure(request_id: u64, error: impl Into<String>) -> Self {
        ServerMessage {
            request_id: Some(request_id),
            status: Some("error".to_string()),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Creates a `notification/insert` event.
    pub fn notification_insert(device_guid: impl Into<String>, notification: Notification) -> Self {
        ServerMessage {
            action: Some(NOTIFICATION_INSERT.to_string()),
            device_guid: Some(device_guid.into()),
            notification: Some(notification),
            ..Default::default()
        }
    }

    /// Creates a `command/update` event.
    pub fn command_update(command: Command) -> Self {
        ServerMessage {
            action: Some(COMMAND_UPDATE.to_string()),
            command: Some(command),
            ..Default::default()
        }
    }

    /// Attaches a command payload.
    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// True when this is a response whose status is `success`.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// The server-supplied failure text, or a generic one.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "request failed without an error message".to_string())
    }

    /// The pushed notification and its device, if this is a `notification/insert` event.
    pub fn inserted_notification(&self) -> Option<(&str, &Notification)> {
        if self.action.as_deref() != Some(NOTIFICATION_INSERT) {
            return None;
        }
        match (&self.device_guid, &self.notification) {
            (Some(device), Some(notification)) => Some((device.as_str(), notification)),
            _ => None,
        }
    }

    /// The updated command and its id, if this is a `command/update` event.
    pub fn updated_command(&self) -> Option<(u64, &Command)> {
        if self.action.as_deref() != Some(COMMAND_UPDATE) {
            return None;
        }
        let command = self.command.as_ref()?;
        command.id.map(|id| (id, command))
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
