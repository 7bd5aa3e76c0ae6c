// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session credentials.
//!
//! The same credential authorizes every HTTP request (as an `Authorization`
//! header) and the WebSocket handshake (as the `authenticate` action).

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use dh_core::ClientMessage;
use serde::{Deserialize, Serialize};

/// Credentials for a DeviceHive server.
///
/// In TOML either `login` + `password` or `access_key` is given.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    /// User login and password, sent as HTTP Basic auth.
    Basic { login: String, password: String },
    /// Access key, sent as a bearer token.
    AccessKey { access_key: String },
}

impl Credential {
    /// Creates login/password credentials.
    pub fn basic(login: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::Basic {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Creates access-key credentials.
    pub fn access_key(key: impl Into<String>) -> Self {
        Credential::AccessKey {
            access_key: key.into(),
        }
    }

    /// Value of the `Authorization` header.
    ///
    /// - Basic: `Basic <base64(login:password)>` (RFC 7617)
    /// - AccessKey: `Bearer <key>`
    pub fn authorization_header(&self) -> String {
        match self {
            Credential::Basic { login, password } => {
                let encoded = general_purpose::STANDARD.encode(format!("{}:{}", login, password));
                format!("Basic {}", encoded)
            }
            Credential::AccessKey { access_key } => format!("Bearer {}", access_key),
        }
    }

    /// The WebSocket handshake message for these credentials.
    pub fn authenticate_message(&self) -> ClientMessage {
        match self {
            Credential::Basic { login, password } => {
                ClientMessage::authenticate(login.clone(), password.clone())
            }
            Credential::AccessKey { access_key } => {
                ClientMessage::authenticate_key(access_key.clone())
            }
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Basic { login, .. } => f
                .debug_struct("Basic")
                .field("login", login)
                .field("password", &"<redacted>")
                .finish(),
            Credential::AccessKey { .. } => f
                .debug_struct("AccessKey")
                .field("access_key", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
