// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[test]
fn listeners_run_in_registration_order() {
    let listeners: Listeners<u32> = Listeners::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let seen = Arc::clone(&seen);
        listeners.add(move |value: &u32| seen.lock().unwrap().push((tag, *value)));
    }

    listeners.emit(&7);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("first", 7), ("second", 7), ("third", 7)]
    );
}

#[test]
fn listener_may_register_during_emit() {
    let listeners: Arc<Listeners<()>> = Arc::new(Listeners::default());
    let inner = Arc::clone(&listeners);
    listeners.add(move |_| inner.add(|_| {}));

    listeners.emit(&());

    assert_eq!(listeners.len(), 2);
}

#[test]
fn channel_events_forward_to_hooks() {
    let notified = Arc::new(Mutex::new(Vec::new()));
    let dropped = Arc::new(AtomicUsize::new(0));
    let events = {
        let notified = Arc::clone(&notified);
        let dropped = Arc::clone(&dropped);
        ChannelEvents::new(
            move |event| notified.lock().unwrap().push(event),
            move || {
                dropped.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    events.notification("d1", Notification::default());
    events.disconnected();

    let notified = notified.lock().unwrap();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].device_id, "d1");
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn detached_events_are_ignored() {
    let events = ChannelEvents::detached();
    events.notification("d1", Notification::default());
    events.disconnected();
}
