//! Common test utilities for panel-socket integration tests
//!
//! Two ways to stand up a peer:
//! - [`mock_connector`]: in-memory connector with scripted outcomes, safe
//!   under paused tokio time
//! - [`MockWsServer`]: real tokio-tungstenite echo server on localhost

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use panel_socket::traits::*;
use panel_socket::{SocketClient, SocketEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the next `connect()` on the mock does
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Accept,
    /// Accept after a delay
    AcceptAfter(Duration),
    Refuse,
    /// Refuse after a delay
    RefuseAfter(Duration),
    /// Accept, but each client write blocks until the server has read the previous one
    AcceptStalled,
    /// Never complete
    Hang,
}

struct ConnectorState {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Outcome>,
    attempts: AtomicUsize,
    sessions: mpsc::UnboundedSender<ServerSide>,
}

/// Scripted in-memory connector
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

/// Test-side view of the connector
pub struct MockHandle {
    state: Arc<ConnectorState>,
    sessions: mpsc::UnboundedReceiver<ServerSide>,
}

/// Server end of one accepted connection
pub struct ServerSide {
    to_client: Option<fmpsc::UnboundedSender<Result<WsMessage>>>,
    from_client: BoxStream<'static, WsMessage>,
}

pub fn mock_connector(script: impl IntoIterator<Item = Outcome>, fallback: Outcome) -> (MockConnector, MockHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(ConnectorState {
        script: Mutex::new(script.into_iter().collect()),
        fallback: Mutex::new(fallback),
        attempts: AtomicUsize::new(0),
        sessions: tx,
    });
    (
        MockConnector {
            state: Arc::clone(&state),
        },
        MockHandle { state, sessions: rx },
    )
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<(FrameSink, FrameStream)> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .state
            .script
            .lock()
            .pop_front()
            .unwrap_or(*self.state.fallback.lock());

        match outcome {
            Outcome::Accept | Outcome::AcceptStalled => {}
            Outcome::AcceptAfter(delay) => tokio::time::sleep(delay).await,
            Outcome::Refuse => return Err(SocketError::WebSocket("connection refused".into())),
            Outcome::RefuseAfter(delay) => {
                tokio::time::sleep(delay).await;
                return Err(SocketError::WebSocket("connection refused".into()));
            }
            Outcome::Hang => std::future::pending::<()>().await,
        }

        let (server_tx, client_rx) = fmpsc::unbounded::<Result<WsMessage>>();
        let (sink, from_client): (FrameSink, BoxStream<'static, WsMessage>) =
            if matches!(outcome, Outcome::AcceptStalled) {
                // zero buffer: a flush waits for the server to take the frame
                let (client_tx, server_rx) = fmpsc::channel::<WsMessage>(0);
                let sink = client_tx.sink_map_err(|e| SocketError::ConnectionClosed(e.to_string()));
                (Box::pin(sink), server_rx.boxed())
            } else {
                let (client_tx, server_rx) = fmpsc::unbounded::<WsMessage>();
                let sink = client_tx.sink_map_err(|e| SocketError::ConnectionClosed(e.to_string()));
                (Box::pin(sink), server_rx.boxed())
            };

        let _ = self.state.sessions.send(ServerSide {
            to_client: Some(server_tx),
            from_client,
        });

        Ok((sink, Box::pin(client_rx)))
    }
}

impl MockHandle {
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn set_fallback(&self, outcome: Outcome) {
        *self.state.fallback.lock() = outcome;
    }

    pub fn push(&self, outcome: Outcome) {
        self.state.script.lock().push_back(outcome);
    }

    /// Wait for the next accepted connection
    pub async fn next_session(&mut self) -> ServerSide {
        self.sessions.recv().await.expect("connector dropped")
    }
}

impl ServerSide {
    pub fn send_text(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            tx.unbounded_send(Ok(WsMessage::Text(text.to_string())))
                .expect("client stream dropped");
        }
    }

    pub fn send_json(&self, value: serde_json::Value) {
        self.send_text(&value.to_string());
    }

    pub fn send_binary(&self, data: &[u8]) {
        if let Some(tx) = &self.to_client {
            tx.unbounded_send(Ok(WsMessage::Binary(data.to_vec())))
                .expect("client stream dropped");
        }
    }

    /// Send a close frame with `code`
    pub fn close(&self, code: u16) {
        if let Some(tx) = &self.to_client {
            let _ = tx.unbounded_send(Ok(WsMessage::Close(Some(CloseInfo::new(code, "server close")))));
        }
    }

    /// Vanish without a close frame (client sees 1006)
    pub fn drop_connection(&mut self) {
        self.to_client = None;
    }

    /// Next frame written by the client
    pub async fn next_frame(&mut self) -> Option<WsMessage> {
        self.from_client.next().await
    }

    /// Next text frame written by the client, parsed as JSON
    pub async fn next_json(&mut self) -> serde_json::Value {
        match self.next_frame().await {
            Some(WsMessage::Text(text)) => serde_json::from_str(&text).expect("client sent non-JSON"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }
}

/// Lifecycle events observed on a client, in emission order
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<(Instant, String)>>>,
    notify: Arc<Notify>,
}

impl EventLog {
    pub fn attach(client: &SocketClient) -> Self {
        let log = Self::default();
        for name in [
            "connected",
            "disconnected",
            "manual_disconnect",
            "reconnecting",
            "reconnect_failed",
            "error",
        ] {
            let log = log.clone();
            client.on(name, move |event| {
                let label = match event {
                    SocketEvent::Connected => "connected".to_string(),
                    SocketEvent::Disconnected { code, .. } => format!("disconnected:{}", code),
                    SocketEvent::ManualDisconnect => "manual_disconnect".to_string(),
                    SocketEvent::Reconnecting { attempt, delay } => {
                        format!("reconnecting:{}:{}", attempt, delay.as_millis())
                    }
                    SocketEvent::ReconnectFailed { attempts } => format!("reconnect_failed:{}", attempts),
                    SocketEvent::Error(_) => "error".to_string(),
                    other => format!("other:{:?}", other),
                };
                log.entries.lock().push((Instant::now(), label));
                log.notify.notify_waiters();
                Ok(())
            });
        }
        log
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, l)| l.starts_with(prefix))
            .count()
    }

    /// Time at which the first event starting with `prefix` was recorded
    pub fn time_of(&self, prefix: &str) -> Option<Instant> {
        self.entries
            .lock()
            .iter()
            .find(|(_, l)| l.starts_with(prefix))
            .map(|(t, _)| *t)
    }

    /// Wait until an event starting with `prefix` has been recorded
    pub async fn wait_for(&self, prefix: &str) {
        loop {
            let notified = self.notify.notified();
            if self.count(prefix) > 0 {
                return;
            }
            tokio::time::timeout(Duration::from_secs(600), notified)
                .await
                .unwrap_or_else(|_| panic!("event '{}' never arrived: {:?}", prefix, self.labels()));
        }
    }
}

/// A simple mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new echo server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            // Answer heartbeats, echo everything else
                            let reply = if text.contains(r#""type":"ping""#) {
                                r#"{"type":"pong"}"#.to_string()
                            } else {
                                text
                            };
                            if write.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
