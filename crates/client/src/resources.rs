// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Resource queries: networks, devices, device classes, notifications,
//! commands and the current user.
//!
//! These are plain REST calls through the session's HTTP transport and
//! return the parsed JSON body. They work whether or not a channel is open.

use dh_core::Timestamp;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::http::{resource_path, HttpRequest};
use crate::session::Session;

/// Sort direction of a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

/// Filter of `GET /network`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// SQL LIKE pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

/// Filter of `GET /device`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

/// Filter of `GET /device/{id}/notification`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

/// Filter of `GET /device/{id}/command`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

/// Flattens a filter into query parameters. Strings are sent bare, other
/// scalars in their JSON form.
pub(crate) fn query_pairs<T: Serialize>(filter: &T) -> Result<Vec<(String, String)>> {
    let Value::Object(map) = serde_json::to_value(filter)? else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect())
}

impl Session {
    async fn get(&self, path: String, query: Vec<(String, String)>) -> Result<Value> {
        let request = HttpRequest::get(path).with_query_pairs(query);
        Ok(self.http().request(request).await?)
    }

    pub async fn networks(&self, filter: &NetworkFilter) -> Result<Value> {
        self.get("/network".to_string(), query_pairs(filter)?).await
    }

    pub async fn network(&self, id: u64) -> Result<Value> {
        self.get(resource_path(&["network", &id.to_string()])?, Vec::new())
            .await
    }

    pub async fn devices(&self, filter: &DeviceFilter) -> Result<Value> {
        self.get("/device".to_string(), query_pairs(filter)?).await
    }

    pub async fn device(&self, id: &str) -> Result<Value> {
        self.get(resource_path(&["device", id])?, Vec::new()).await
    }

    pub async fn device_class(&self, id: u64) -> Result<Value> {
        self.get(resource_path(&["device", "class", &id.to_string()])?, Vec::new())
            .await
    }

    /// Latest equipment state reported by a device.
    pub async fn equipment_state(&self, device_id: &str) -> Result<Value> {
        self.get(resource_path(&["device", device_id, "equipment"])?, Vec::new())
            .await
    }

    pub async fn notifications(&self, device_id: &str, filter: &NotificationFilter) -> Result<Value> {
        self.get(
            resource_path(&["device", device_id, "notification"])?,
            query_pairs(filter)?,
        )
        .await
    }

    pub async fn notification(&self, device_id: &str, id: u64) -> Result<Value> {
        self.get(
            resource_path(&["device", device_id, "notification", &id.to_string()])?,
            Vec::new(),
        )
        .await
    }

    pub async fn commands(&self, device_id: &str, filter: &CommandFilter) -> Result<Value> {
        self.get(
            resource_path(&["device", device_id, "command"])?,
            query_pairs(filter)?,
        )
        .await
    }

    pub async fn command(&self, device_id: &str, id: u64) -> Result<Value> {
        self.get(
            resource_path(&["device", device_id, "command", &id.to_string()])?,
            Vec::new(),
        )
        .await
    }

    pub async fn current_user(&self) -> Result<Value> {
        self.get("/user/current".to_string(), Vec::new()).await
    }

    /// Updates the current user's profile with the fields in `user`.
    pub async fn update_current_user(&self, user: Value) -> Result<Value> {
        Ok(self
            .http()
            .request(HttpRequest::put("/user/current", user))
            .await?)
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
