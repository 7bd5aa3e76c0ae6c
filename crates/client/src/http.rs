// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport primitive.
//!
//! Every REST call the session or a channel makes goes through an
//! [`HttpTransport`]. The production implementation is [`ReqwestTransport`];
//! tests substitute an in-memory one.

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Credential;
use crate::error::{Error, Result};

/// HTTP verbs used by the DeviceHive REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// Joins `segments` into an absolute request path, percent-encoding each
/// segment so ids containing `/`, `?` or `#` stay within their segment.
pub(crate) fn resource_path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|e| Error::Config(format!("failed to build request path: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::Config("failed to build request path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_string())
}

/// One REST call, relative to the service URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path below the service URL, starting with `/`.
    pub path: String,
    /// Query parameters in the order they are sent.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        HttpRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        HttpRequest {
            body: Some(body),
            ..Self::new(Method::Post, path)
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        HttpRequest {
            body: Some(body),
            ..Self::new(Method::Put, path)
        }
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends every pair in `pairs`.
    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Returns the first value of query parameter `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Failure of a single HTTP call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),

    /// The response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl HttpError {
    /// Builds the error for a failed response.
    ///
    /// The message is the `message` field of a JSON body, or the raw body
    /// text when the body is not such an object.
    pub fn from_response(status: u16, body: &str) -> Self {
        let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let message = match from_json {
            Some(message) => message,
            None if !body.trim().is_empty() => body.trim().to_string(),
            None => format!("HTTP {}", status),
        };
        HttpError::Status { status, message }
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Parses a success body. An empty body is JSON `null`.
pub fn parse_body(body: &str) -> std::result::Result<Value, HttpError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| HttpError::Decode(e.to_string()))
}

/// Transport primitive for REST calls.
///
/// Implementations resolve with the parsed JSON body on a 2xx status and
/// with [`HttpError`] otherwise.
pub trait HttpTransport: Send + Sync {
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, std::result::Result<Value, HttpError>>;
}

/// Sends `request` and decodes the body into `T`.
pub(crate) async fn fetch<T: DeserializeOwned>(
    http: &dyn HttpTransport,
    request: HttpRequest,
) -> Result<T> {
    let value = http.request(request).await?;
    serde_json::from_value(value).map_err(|e| Error::Http(HttpError::Decode(e.to_string())))
}

/// [`HttpTransport`] backed by reqwest.
pub struct ReqwestTransport {
    base_url: String,
    credential: Credential,
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport for the service at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(ReqwestTransport {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
            inner,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: HttpRequest) -> std::result::Result<Value, HttpError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, %url, "http request");

        let mut builder = match request.method {
            Method::Get => self.inner.get(&url),
            Method::Post => self.inner.post(&url),
            Method::Put => self.inner.put(&url),
        };
        builder = builder.header(
            reqwest::header::AUTHORIZATION,
            self.credential.authorization_header(),
        );
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), %url, "http request failed");
            return Err(HttpError::from_response(status.as_u16(), &text));
        }
        parse_body(&text)
    }
}

impl HttpTransport for ReqwestTransport {
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, std::result::Result<Value, HttpError>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
