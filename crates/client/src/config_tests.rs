// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn parses_minimal_config_with_defaults() {
    let config = SessionConfig::from_toml(
        r#"
service_url = "http://hive.example/api"

[credential]
login = "alice"
password = "secret"
"#,
    )
    .unwrap();

    assert_eq!(config.service_url, "http://hive.example/api");
    assert_eq!(config.credential, Credential::basic("alice", "secret"));
    assert_eq!(config.channels, ChannelKind::ALL.to_vec());
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.poll_retry(), Duration::from_secs(1));
    assert_eq!(config.http_timeout(), None);
}

#[test]
fn parses_full_config() {
    let config = SessionConfig::from_toml(
        r#"
service_url = "https://hive.example/api"
channels = ["longpolling"]
request_timeout_ms = 2500
poll_retry_ms = 250
http_timeout_secs = 120

[credential]
access_key = "key-1"
"#,
    )
    .unwrap();

    assert_eq!(config.credential, Credential::access_key("key-1"));
    assert_eq!(config.channels, vec![ChannelKind::LongPolling]);
    assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.poll_retry(), Duration::from_millis(250));
    assert_eq!(config.http_timeout(), Some(Duration::from_secs(120)));
    config.validate().unwrap();
}

#[test]
fn rejects_unknown_channel_name() {
    let err = SessionConfig::from_toml(
        r#"
service_url = "http://hive.example/api"
channels = ["pigeon"]

[credential]
access_key = "k"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn missing_credential_is_a_parse_error() {
    let err = SessionConfig::from_toml(r#"service_url = "http://hive.example/api""#).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[parameterized(
    not_http = { "ws://hive.example/api" },
    no_scheme = { "hive.example/api" },
    no_host = { "http://" },
    only_slash = { "https:///" },
)]
fn validate_rejects_bad_service_url(url: &str) {
    let config = SessionConfig::new(url, Credential::access_key("k"));
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[parameterized(
    empty_login = { Credential::basic("", "pw") },
    empty_key = { Credential::access_key("") },
)]
fn validate_rejects_empty_credential(credential: Credential) {
    let config = SessionConfig::new("http://hive.example/api", credential);
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
fn validate_rejects_empty_channel_list() {
    let mut config = SessionConfig::new("http://hive.example/api", Credential::access_key("k"));
    config.channels.clear();
    assert!(config.validate().is_err());
}

#[test]
fn save_then_load_preserves_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("session.toml");
    let mut config = SessionConfig::new("http://hive.example/api", Credential::basic("alice", "pw"));
    config.channels = vec![ChannelKind::LongPolling, ChannelKind::WebSocket];
    config.http_timeout_secs = Some(30);

    config.save(&path).unwrap();
    let loaded = SessionConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn load_missing_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = SessionConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn default_path_ends_with_session_toml() {
    if let Some(path) = SessionConfig::default_path() {
        assert!(path.ends_with("devicehive/session.toml"));
    }
}
