// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! dh-core: Shared data model for the DeviceHive client
//!
//! This crate provides the payload types exchanged with a DeviceHive server
//! and the JSON frames of its WebSocket protocol. It has no I/O of its own.

pub mod error;
pub mod model;
pub mod protocol;
pub mod timestamp;

pub use error::{Error, Result};
pub use model::{Command, DeviceNotification, Notification, ServerInfo};
pub use protocol::{ClientMessage, Request, ServerMessage};
pub use timestamp::Timestamp;
