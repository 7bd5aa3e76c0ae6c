// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn invalid_timestamp_display_includes_input_and_hint() {
    let msg = Error::InvalidTimestamp("yesterday".into()).to_string();
    assert!(msg.contains("'yesterday'"));
    assert!(msg.contains("hint:"));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
    assert!(err.to_string().starts_with("json error"));
}
