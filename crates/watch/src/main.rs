// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! dh-watch: command-line front end for a DeviceHive session.
//!
//! Opens a channel, subscribes to the requested devices and prints every
//! notification as one JSON line on stdout. Optionally sends one command and
//! prints its result when the device reports it.

mod cli;

use clap::Parser;
use devicehive::{DeviceNotification, Session};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging on stderr; RUST_LOG overrides the default level
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.session_config()?;
    info!("Starting dh-watch");
    info!("  Service URL: {}", config.service_url);
    info!(
        "  Channels: {}",
        config
            .channels
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let session = Session::from_config(&config)?;
    session.on_state_changed(|change| {
        info!(old = %change.old_state, new = %change.new_state, "channel state changed");
    });
    session.on_notification(|event| {
        let line = DeviceNotification {
            device_guid: event.device_id.clone(),
            notification: event.notification.clone(),
        };
        match serde_json::to_string(&line) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "failed to encode notification"),
        }
    });

    session.open_channel(None).await?;
    if let Some(kind) = session.active_kind() {
        info!("  Connected via {}", kind);
    }
    session.subscribe(args.subscription()).await?;

    if let (Some(name), Some(device)) = (&args.command, args.devices.first()) {
        let sent = session
            .send_command(device.clone(), name.clone(), args.command_parameters()?)
            .await?;
        info!(command_id = ?sent.id(), "command sent");
        sent.result(|command| println!("{}", json!({ "command": command })));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.close_channel().await;
    Ok(())
}
