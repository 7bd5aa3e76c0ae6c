// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    websocket = { "websocket", ChannelKind::WebSocket },
    ws = { "ws", ChannelKind::WebSocket },
    mixed_case = { "WebSocket", ChannelKind::WebSocket },
    longpolling = { "longpolling", ChannelKind::LongPolling },
    dashed = { "long-polling", ChannelKind::LongPolling },
    poll = { "poll", ChannelKind::LongPolling },
)]
fn channel_kind_from_str(input: &str, expected: ChannelKind) {
    assert_eq!(input.parse::<ChannelKind>().unwrap(), expected);
}

#[test]
fn channel_kind_rejects_unknown_name() {
    let err = "carrier-pigeon".parse::<ChannelKind>().unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));
}

#[test]
fn channel_kind_serde_uses_lowercase_names() {
    assert_eq!(
        serde_json::to_string(&ChannelKind::ALL).unwrap(),
        r#"["websocket","longpolling"]"#
    );
    let kind: ChannelKind = serde_json::from_str(r#""longpolling""#).unwrap();
    assert_eq!(kind, ChannelKind::LongPolling);
    assert_eq!(ChannelKind::WebSocket.to_string(), "websocket");
}

#[test]
fn single_id_becomes_one_element_list() {
    assert_eq!(Devices::from("d1"), Devices::Only(vec!["d1".to_string()]));
    assert_eq!(
        Devices::from("d1".to_string()),
        Devices::Only(vec!["d1".to_string()])
    );
}

#[test]
fn id_collections_convert() {
    let expected = Devices::Only(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(Devices::from(vec!["a", "b"]), expected);
    assert_eq!(Devices::from(&["a", "b"][..]), expected);
    assert_eq!(
        Devices::from(vec!["a".to_string(), "b".to_string()]),
        expected
    );
    assert_eq!(Devices::from(None::<Vec<String>>), Devices::All);
}

#[test]
fn into_ids_maps_all_to_none() {
    assert_eq!(Devices::All.into_ids(), None);
    assert_eq!(Devices::from("x").into_ids(), Some(vec!["x".to_string()]));
}

#[test]
fn apply_assigned_copies_server_fields() {
    let mut command = Command::new("blink", Some(json!({"times": 3})));
    let assigned: Command =
        serde_json::from_value(json!({"id": 42, "timestamp": "2024-01-01T00:00:01.000", "userId": 7}))
            .unwrap();

    apply_assigned(&mut command, assigned);

    assert_eq!(command.id, Some(42));
    assert_eq!(command.user_id, Some(7));
    assert_eq!(command.command, "blink");
    assert_eq!(command.parameters, Some(json!({"times": 3})));
    assert!(command.timestamp.is_some());
}

fn sent(result: Result<Option<Command>>) -> SentCommand {
    let mut command = Command::new("blink", None);
    command.id = Some(42);
    SentCommand::new(command, Box::pin(async move { result }))
}

#[tokio::test]
async fn result_callback_fires_with_executed_command() {
    let mut executed = Command::new("blink", None);
    executed.id = Some(42);
    executed.status = Some("Completed".into());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = Arc::clone(&seen);
    sent(Ok(Some(executed)))
        .result(move |command| recorder.lock().unwrap().push(command))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status.as_deref(), Some("Completed"));
}

async fn assert_callback_not_fired(result: Result<Option<Command>>) {
    let fired = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&fired);
    sent(result)
        .result(move |_| *flag.lock().unwrap() = true)
        .await
        .unwrap();
    assert!(!*fired.lock().unwrap());
}

#[tokio::test]
async fn result_callback_not_fired_without_result() {
    assert_callback_not_fired(Ok(None)).await;
}

#[tokio::test]
async fn result_callback_not_fired_when_wait_fails() {
    assert_callback_not_fired(Err(Error::ChannelClosed)).await;
}

#[tokio::test]
async fn wait_returns_result_and_keeps_id() {
    let sent = sent(Ok(None));
    assert_eq!(sent.id(), Some(42));
    assert_eq!(sent.command().command, "blink");
    assert!(sent.wait().await.unwrap().is_none());
}
