// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: a scripted HTTP server and an in-memory socket.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dh_core::protocol::{ClientMessage, Request, ServerMessage};
use dh_core::{ServerInfo, Timestamp};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};

use crate::auth::Credential;
use crate::channel::{
    ChannelContext, FrameSink, FrameSource, SocketConnection, SocketConnector, TransportError,
    TransportResult,
};
use crate::events::{ChannelEvents, NotificationEvent};
use crate::http::{HttpError, HttpRequest, HttpTransport, Method};

type Response = Result<Value, HttpError>;

#[derive(Default)]
struct Route {
    queue: VecDeque<Response>,
    sticky: Option<Response>,
}

/// Scripted [`HttpTransport`].
///
/// Responses are queued per `"METHOD /path"`. A request with nothing queued
/// waits until a response is queued, the way a long poll hangs on a quiet
/// server.
pub struct MockHttp {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    seen_tx: mpsc::UnboundedSender<HttpRequest>,
    seen_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<HttpRequest>>,
    wake: Notify,
}

fn route_key(method: Method, path: &str) -> String {
    format!("{} {}", method, path)
}

impl MockHttp {
    pub fn new() -> Arc<Self> {
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        Arc::new(MockHttp {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            seen_tx,
            seen_rx: tokio::sync::Mutex::new(seen_rx),
            wake: Notify::new(),
        })
    }

    /// A server whose `/info` always answers with `info_json(ws_url)`.
    pub fn with_info(ws_url: Option<&str>) -> Arc<Self> {
        let http = Self::new();
        http.respond_always(Method::Get, "/info", Ok(info_json(ws_url)));
        http
    }

    /// Queues one response.
    pub fn respond(&self, method: Method, path: &str, response: Response) {
        self.routes
            .lock()
            .unwrap()
            .entry(route_key(method, path))
            .or_default()
            .queue
            .push_back(response);
        self.wake.notify_waiters();
    }

    /// Answers every request that finds the queue empty.
    pub fn respond_always(&self, method: Method, path: &str, response: Response) {
        self.routes
            .lock()
            .unwrap()
            .entry(route_key(method, path))
            .or_default()
            .sticky = Some(response);
        self.wake.notify_waiters();
    }

    fn take(&self, key: &str) -> Option<Response> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.get_mut(key)?;
        route.queue.pop_front().or_else(|| route.sticky.clone())
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Waits for the next request to arrive.
    pub async fn next_request(&self) -> HttpRequest {
        let mut seen = self.seen_rx.lock().await;
        tokio::time::timeout(Duration::from_secs(30), seen.recv())
            .await
            .expect("timed out waiting for an http request")
            .expect("request log closed")
    }

    /// Waits for the next request to `path`, skipping others.
    pub async fn next_request_to(&self, path: &str) -> HttpRequest {
        loop {
            let request = self.next_request().await;
            if request.path == path {
                return request;
            }
        }
    }
}

impl HttpTransport for MockHttp {
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<Value, HttpError>> {
        Box::pin(async move {
            let key = route_key(request.method, &request.path);
            self.requests.lock().unwrap().push(request.clone());
            let _ = self.seen_tx.send(request);
            loop {
                let notified = self.wake.notified();
                if let Some(response) = self.take(&key) {
                    return response;
                }
                notified.await;
            }
        })
    }
}

pub const SERVER_TIME: &str = "2024-01-01T00:00:00.000";

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

pub fn info_json(ws_url: Option<&str>) -> Value {
    let mut info = json!({
        "apiVersion": "1.3.0",
        "serverTimestamp": SERVER_TIME,
    });
    if let Some(url) = ws_url {
        info["webSocketServerUrl"] = json!(url);
    }
    info
}

pub fn server_info(ws_url: Option<&str>) -> ServerInfo {
    serde_json::from_value(info_json(ws_url)).unwrap()
}

/// Collects notification events.
#[derive(Clone, Default)]
pub struct Collected {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    disconnects: Arc<Mutex<usize>>,
}

impl Collected {
    pub fn channel_events(&self) -> ChannelEvents {
        let events = Arc::clone(&self.events);
        let disconnects = Arc::clone(&self.disconnects);
        ChannelEvents::new(
            move |event| events.lock().unwrap().push(event),
            move || *disconnects.lock().unwrap() += 1,
        )
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.device_id).collect()
    }

    pub fn disconnects(&self) -> usize {
        *self.disconnects.lock().unwrap()
    }
}

/// A channel context over `http` and an optional socket connector.
pub fn context(
    http: Arc<MockHttp>,
    info: ServerInfo,
    connector: Option<Arc<dyn SocketConnector>>,
    events: ChannelEvents,
) -> ChannelContext {
    ChannelContext {
        http,
        server_info: info,
        credential: Credential::basic("alice", "secret"),
        connector,
        events,
        request_timeout: Duration::from_secs(10),
        poll_retry: Duration::from_secs(1),
    }
}

/// In-memory [`SocketConnector`]; each connection is handed to the test as
/// a [`MockServer`].
pub struct MockConnector {
    servers: mpsc::UnboundedSender<MockServer>,
    urls: Mutex<Vec<String>>,
    fail: Option<TransportError>,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockServer>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(MockConnector {
            servers,
            urls: Mutex::new(Vec::new()),
            fail: None,
        });
        (connector, rx)
    }

    /// A connector whose every connect attempt fails.
    pub fn failing() -> Arc<Self> {
        let (servers, _) = mpsc::unbounded_channel();
        Arc::new(MockConnector {
            servers,
            urls: Mutex::new(Vec::new()),
            fail: Some(TransportError::ConnectionFailed("connection refused".into())),
        })
    }

    /// URLs of all connect attempts.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl SocketConnector for MockConnector {
    fn connect(&self, url: &str) -> BoxFuture<'_, TransportResult<SocketConnection>> {
        self.urls.lock().unwrap().push(url.to_string());
        Box::pin(async move {
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            let (requests_tx, requests_rx) = mpsc::unbounded_channel();
            let (frames_tx, frames_rx) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            let server = MockServer {
                requests: requests_rx,
                frames: Some(frames_tx),
                closed: Arc::clone(&closed),
            };
            self.servers
                .send(server)
                .map_err(|_| TransportError::ConnectionFailed("no server".into()))?;
            Ok(SocketConnection {
                sink: Box::new(MockSink {
                    requests: requests_tx,
                    closed,
                }),
                source: Box::new(MockSource { frames: frames_rx }),
            })
        })
    }
}

struct MockSink {
    requests: mpsc::UnboundedSender<Request>,
    closed: Arc<AtomicBool>,
}

impl FrameSink for MockSink {
    fn send(&mut self, request: Request) -> BoxFuture<'_, TransportResult<()>> {
        let result = self
            .requests
            .send(request)
            .map_err(|_| TransportError::ConnectionClosed);
        Box::pin(async move { result })
    }

    fn close(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

struct MockSource {
    frames: mpsc::UnboundedReceiver<ServerMessage>,
}

impl FrameSource for MockSource {
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>> {
        Box::pin(async move { Ok(self.frames.recv().await) })
    }
}

/// Test side of an in-memory socket connection.
pub struct MockServer {
    requests: mpsc::UnboundedReceiver<Request>,
    frames: Option<mpsc::UnboundedSender<ServerMessage>>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    pub async fn next_request(&mut self) -> Request {
        tokio::time::timeout(Duration::from_secs(30), self.requests.recv())
            .await
            .expect("timed out waiting for a socket request")
            .expect("client dropped the connection")
    }

    /// Pushes a frame to the client.
    pub fn reply(&self, message: ServerMessage) {
        if let Some(frames) = &self.frames {
            let _ = frames.send(message);
        }
    }

    /// Expects the handshake and answers it with success.
    pub async fn accept_auth(&mut self) -> Request {
        let request = self.next_request().await;
        assert!(
            matches!(request.message, ClientMessage::Authenticate { .. }),
            "expected authenticate, got {:?}",
            request.message
        );
        self.reply(ServerMessage::success(request.request_id));
        request
    }

    /// Closes the server side; the client reader sees end of stream.
    pub fn hang_up(&mut self) {
        self.frames = None;
    }

    /// Whether the client closed its sink.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
