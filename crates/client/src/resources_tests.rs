// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use super::*;
use crate::auth::Credential;
use crate::http::{HttpError, HttpTransport, Method};
use crate::test_helpers::{ts, MockHttp};
use serde_json::json;

fn session(http: &Arc<MockHttp>) -> Session {
    Session::builder("http://hive.example/api", Credential::access_key("k"))
        .http_transport(Arc::clone(http) as Arc<dyn HttpTransport>)
        .build()
        .unwrap()
}

#[test]
fn query_pairs_skip_absent_fields() {
    let filter = DeviceFilter {
        name_pattern: Some("%lamp%".into()),
        network_id: Some(3),
        sort_order: Some(SortOrder::Descending),
        take: Some(10),
        ..Default::default()
    };
    let mut pairs = query_pairs(&filter).unwrap();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("namePattern".to_string(), "%lamp%".to_string()),
            ("networkId".to_string(), "3".to_string()),
            ("sortOrder".to_string(), "DESC".to_string()),
            ("take".to_string(), "10".to_string()),
        ]
    );
    assert!(query_pairs(&NetworkFilter::default()).unwrap().is_empty());
}

#[test]
fn timestamps_use_server_format() {
    let filter = NotificationFilter {
        start: Some(ts("2024-01-01T00:00:00")),
        end: Some(ts("2024-01-02T12:30:00.5")),
        ..Default::default()
    };
    let pairs = query_pairs(&filter).unwrap();
    assert!(pairs.contains(&("start".to_string(), "2024-01-01T00:00:00.000".to_string())));
    assert!(pairs.contains(&("end".to_string(), "2024-01-02T12:30:00.500".to_string())));
}

#[tokio::test]
async fn devices_sends_filter_as_query() {
    let http = MockHttp::new();
    http.respond(Method::Get, "/device", Ok(json!([{"id": "d1"}])));
    let session = session(&http);

    let devices = session
        .devices(&DeviceFilter {
            status: Some("Online".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(devices, json!([{"id": "d1"}]));
    let request = &http.requests()[0];
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.query_value("status"), Some("Online"));
}

#[tokio::test]
async fn device_ids_stay_within_their_path_segment() {
    let http = MockHttp::new();
    http.respond(
        Method::Get,
        "/device/a%2Fb%3Fc/equipment",
        Ok(json!({"ok": true})),
    );
    let session = session(&http);

    assert_eq!(
        session.equipment_state("a/b?c").await.unwrap(),
        json!({"ok": true})
    );
    assert_eq!(
        http.requests()[0].path,
        "/device/a%2Fb%3Fc/equipment"
    );
}

#[tokio::test]
async fn single_resources_use_their_paths() {
    let http = MockHttp::new();
    for path in [
        "/network/5",
        "/device/d1",
        "/device/class/2",
        "/device/d1/equipment",
        "/device/d1/notification/9",
        "/device/d1/command/11",
        "/user/current",
    ] {
        http.respond(Method::Get, path, Ok(json!({"path": path})));
    }
    let session = session(&http);

    assert_eq!(session.network(5).await.unwrap()["path"], "/network/5");
    assert_eq!(session.device("d1").await.unwrap()["path"], "/device/d1");
    assert_eq!(session.device_class(2).await.unwrap()["path"], "/device/class/2");
    assert_eq!(
        session.equipment_state("d1").await.unwrap()["path"],
        "/device/d1/equipment"
    );
    assert_eq!(
        session.notification("d1", 9).await.unwrap()["path"],
        "/device/d1/notification/9"
    );
    assert_eq!(
        session.command("d1", 11).await.unwrap()["path"],
        "/device/d1/command/11"
    );
    assert_eq!(session.current_user().await.unwrap()["path"], "/user/current");
}

#[tokio::test]
async fn list_queries_for_a_device() {
    let http = MockHttp::new();
    http.respond(Method::Get, "/device/d1/notification", Ok(json!([])));
    http.respond(Method::Get, "/device/d1/command", Ok(json!([])));
    http.respond(Method::Get, "/network", Ok(json!([])));
    let session = session(&http);

    session
        .notifications(
            "d1",
            &NotificationFilter {
                notification: Some("temp".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session
        .commands(
            "d1",
            &CommandFilter {
                command: Some("blink".into()),
                skip: Some(20),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    session
        .networks(&NetworkFilter {
            name: Some("home".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let requests = http.requests();
    assert_eq!(requests[0].query_value("notification"), Some("temp"));
    assert_eq!(requests[1].query_value("skip"), Some("20"));
    assert_eq!(requests[2].query_value("name"), Some("home"));
}

#[tokio::test]
async fn update_current_user_puts_body() {
    let http = MockHttp::new();
    http.respond(Method::Put, "/user/current", Ok(Value::Null));
    let session = session(&http);

    session
        .update_current_user(json!({"password": "new"}))
        .await
        .unwrap();

    let request = &http.requests()[0];
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.body, Some(json!({"password": "new"})));
}

#[tokio::test]
async fn server_errors_carry_message() {
    let http = MockHttp::new();
    http.respond(
        Method::Get,
        "/device/missing",
        Err(HttpError::from_response(404, r#"{"message":"Device not found"}"#)),
    );
    let session = session(&http);

    let err = session.device("missing").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "DeviceHive server error - Device not found (status 404)"
    );
}
