use crate::config::SocketConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Transition};
use crate::connector::CLOSE_NO_STATUS;
use crate::events::{names, EventRegistry, HandlerId, SocketEvent, Subscription};
use crate::heartbeat::Heartbeat;
use crate::pong_tracker::PongTracker;
use crate::queue::MessageQueue;
use crate::reconnect_state::{NextAttempt, ReconnectState, ReconnectTracker};
use crate::traits::*;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Subscription token for socket events
pub type SocketSubscription = Subscription<SocketEvent>;

type SharedAttempt = Shared<BoxFuture<'static, Result<()>>>;

/// Client metrics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_queued: u64,
    pub messages_dropped: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
    pub queue_len: usize,
}

/// How a connected session ended
enum SessionEnd {
    /// `disconnect()` asked the session to stop
    Manual,
    /// The socket closed, cleanly or not
    Closed(CloseInfo),
}

/// Handle on the running connection loop
struct Session {
    shutdown: oneshot::Sender<()>,
}

struct Inner {
    config: SocketConfig,
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    events: EventRegistry<SocketEvent>,
    /// Lock order: `queue` before `outbound`
    queue: Mutex<MessageQueue>,
    /// Writer channel of the live session, present only while connected
    outbound: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    reconnect: Mutex<ReconnectTracker>,
    auto_reconnect: AtomicBool,
    /// Outcome of the latest connection attempt; guards every move into `Connecting`
    attempt: Mutex<Option<SharedAttempt>>,
    reconnect_timer: Mutex<Option<JoinHandle<()>>>,
    session: Mutex<Option<Session>>,
    /// Bumped by each new attempt and by `disconnect()`; stale tasks compare and bail
    generation: AtomicU64,
    pong_tracker: Option<PongTracker>,
}

/// Auto-reconnecting WebSocket client
///
/// Keeps one logical connection alive over an unreliable socket:
/// - Exponential-backoff reconnection after unclean closures
/// - Heartbeat while connected (`{"type":"ping"}`), pong frames swallowed
/// - Bounded FIFO queue for sends issued while disconnected, flushed in
///   order on reconnect before any newer send
/// - Named event subscriptions for lifecycle events and typed inbound frames
///
/// Cloning is cheap; all clones drive the same connection.
#[derive(Clone)]
pub struct SocketClient {
    inner: Arc<Inner>,
}

impl SocketClient {
    /// Start building a client
    pub fn builder() -> crate::builder::SocketClientBuilder<crate::builder::states::NoUrl> {
        crate::builder::SocketClientBuilder::new()
    }

    pub(crate) fn new(config: SocketConfig, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        let pong_tracker = config.heartbeat_timeout.map(PongTracker::new);
        let queue = MessageQueue::new(config.max_queue_size);
        let auto_reconnect = config.auto_reconnect;

        Self {
            inner: Arc::new(Inner {
                config,
                state: AtomicConnectionState::new(ConnectionState::Disconnected),
                metrics: AtomicMetrics::new(),
                events: EventRegistry::new(),
                queue: Mutex::new(queue),
                outbound: Mutex::new(None),
                reconnect: Mutex::new(ReconnectTracker::new(strategy)),
                auto_reconnect: AtomicBool::new(auto_reconnect),
                attempt: Mutex::new(None),
                reconnect_timer: Mutex::new(None),
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                pong_tracker,
            }),
        }
    }

    /// Open the connection
    ///
    /// Resolves once the socket is open. Rejects on connection timeout or a
    /// socket error during the attempt. Already connected resolves
    /// immediately; already connecting waits on the attempt in flight.
    pub async fn connect(&self) -> Result<()> {
        let attempt = {
            let mut slot = self.inner.attempt.lock();
            match self.inner.state.get() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => slot.clone().ok_or_else(|| {
                    SocketError::InvalidState("connecting without an attempt in flight".into())
                })?,
                ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                    self.inner
                        .auto_reconnect
                        .store(self.inner.config.auto_reconnect, Ordering::Release);
                    cancel_reconnect_timer(&self.inner);
                    let attempt = begin_attempt(&self.inner, Transition::Connect)?;
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    /// Tear the connection down and stop reconnecting
    ///
    /// Idempotent: only the first call after a live (or pending) connection
    /// emits `manual_disconnect`.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        inner.auto_reconnect.store(false, Ordering::Release);
        inner.generation.fetch_add(1, Ordering::AcqRel);
        cancel_reconnect_timer(inner);

        let previous = {
            let _queue = inner.queue.lock();
            let previous = inner
                .state
                .transition(Transition::ManualDisconnect)
                .map(|(from, _)| from)
                .unwrap_or(ConnectionState::Disconnected);
            *inner.outbound.lock() = None;
            previous
        };

        if let Some(session) = inner.session.lock().take() {
            let _ = session.shutdown.send(());
        }
        inner.reconnect.lock().reset();

        if previous == ConnectionState::Disconnected {
            debug!("disconnect() called while already disconnected");
            return;
        }

        info!("Disconnected from {} by caller", inner.config.url);
        if previous == ConnectionState::Connected {
            inner.events.emit(
                names::DISCONNECTED,
                &SocketEvent::Disconnected {
                    code: CLOSE_NORMAL,
                    reason: "client disconnect".into(),
                },
            );
        }
        inner
            .events
            .emit(names::MANUAL_DISCONNECT, &SocketEvent::ManualDisconnect);
    }

    /// Send a text or JSON payload
    ///
    /// Returns `true` when handed to the live connection. While
    /// disconnected the payload is queued (if enabled) and `false` is
    /// returned; queueing is not an error.
    pub fn send(&self, data: impl Into<Outbound>) -> bool {
        let inner = &self.inner;
        let payload = data.into().into_text();
        let mut queue = inner.queue.lock();

        if inner.state.is_connected() {
            if let Some(tx) = inner.outbound.lock().as_ref() {
                if tx.send(WsMessage::Text(payload)).is_ok() {
                    return true;
                }
                warn!("Connection writer closed, message dropped");
                inner.metrics.increment_dropped();
                return false;
            }
        }

        if !inner.config.queue_messages {
            warn!("Socket not connected, message not sent");
            inner.metrics.increment_dropped();
            return false;
        }

        if queue.push(payload).is_some() {
            inner.metrics.increment_dropped();
            debug!("Outbound queue full, dropped oldest message");
        }
        inner.metrics.increment_queued();
        debug!("Socket not connected, message queued ({} pending)", queue.len());
        false
    }

    /// Serialize `data` to JSON and send it
    pub fn send_json<T: Serialize>(&self, data: &T) -> Result<bool> {
        let value = serde_json::to_value(data)?;
        Ok(self.send(value))
    }

    /// Subscribe to an event by name
    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> SocketSubscription
    where
        F: Fn(&SocketEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.events.on(name, handler)
    }

    /// Subscribe for the next emission only
    pub fn once<F>(&self, name: impl Into<String>, handler: F) -> SocketSubscription
    where
        F: Fn(&SocketEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.events.once(name, handler)
    }

    /// Subscribe to inbound frames of one `type`, decoded into `T`
    ///
    /// Frames whose payload does not fit `T` are logged and skipped.
    pub fn on_message<T, F>(&self, message_type: impl Into<String>, handler: F) -> SocketSubscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> Result<()> + Send + Sync + 'static,
    {
        let name = message_type.into();
        let label = name.clone();
        self.inner.events.on(name, move |event: &SocketEvent| {
            let Some(value) = event.as_json() else {
                return Ok(());
            };
            match serde_json::from_value::<T>(value.clone()) {
                Ok(typed) => handler(typed),
                Err(e) => {
                    warn!("Ignoring '{}' frame with unexpected shape: {}", label, e);
                    Ok(())
                }
            }
        })
    }

    /// Remove one handler
    pub fn off(&self, name: &str, id: HandlerId) -> bool {
        self.inner.events.off(name, id)
    }

    /// Remove all handlers of `name`, or every handler when `None`
    pub fn off_all(&self, name: Option<&str>) {
        self.inner.events.off_all(name)
    }

    /// Get current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.inner.state.is_connected()
    }

    /// Messages waiting for the next connection
    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn reconnect_state(&self) -> ReconnectState {
        self.inner.reconnect.lock().state()
    }

    /// Enable or disable reconnects after unclean closures
    ///
    /// Disabling while a backoff is pending abandons it: the client moves
    /// to `Disconnected` and emits `disconnected`.
    pub fn set_auto_reconnect(&self, enabled: bool) {
        let inner = &self.inner;
        inner.auto_reconnect.store(enabled, Ordering::Release);
        if enabled {
            return;
        }
        cancel_reconnect_timer(inner);

        let abandoned = {
            let _slot = inner.attempt.lock();
            inner.state.is_reconnecting() && inner.state.transition(Transition::Closed).is_ok()
        };
        if !abandoned {
            return;
        }

        inner.reconnect.lock().reset();
        info!("Auto-reconnect disabled, no longer reconnecting to {}", inner.config.url);
        inner.events.emit(
            names::DISCONNECTED,
            &SocketEvent::Disconnected {
                code: CLOSE_NORMAL,
                reason: "auto-reconnect disabled".into(),
            },
        );
    }

    /// Time since the peer was last heard from (needs a heartbeat timeout)
    pub fn time_since_last_traffic(&self) -> Option<Duration> {
        self.inner
            .pong_tracker
            .as_ref()
            .and_then(PongTracker::time_since_last_pong)
    }

    pub fn config(&self) -> &SocketConfig {
        &self.inner.config
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        let metrics = &self.inner.metrics;
        Metrics {
            messages_sent: metrics.messages_sent(),
            messages_received: metrics.messages_received(),
            messages_queued: metrics.messages_queued(),
            messages_dropped: metrics.messages_dropped(),
            reconnect_count: metrics.reconnect_count(),
            connection_state: self.state(),
            queue_len: self.queued_len(),
        }
    }
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish()
    }
}

fn cancel_reconnect_timer(inner: &Inner) {
    if let Some(timer) = inner.reconnect_timer.lock().take() {
        timer.abort();
    }
}

/// Move into `Connecting` and spawn the attempt
///
/// Callers hold the `attempt` lock so that concurrent `connect()` calls
/// observe the new attempt together with the state change.
fn begin_attempt(inner: &Arc<Inner>, transition: Transition) -> Result<SharedAttempt> {
    inner.state.transition(transition)?;
    let reconnecting = transition == Transition::BackoffElapsed;
    let generation = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

    let task_inner = Arc::clone(inner);
    let handle = tokio::spawn(async move { run_attempt(task_inner, generation, reconnecting).await });

    Ok(async move {
        handle
            .await
            .unwrap_or_else(|e| Err(SocketError::WebSocket(format!("connection task failed: {}", e))))
    }
    .boxed()
    .shared())
}

/// One connection attempt, bounded by the connection timeout
async fn run_attempt(inner: Arc<Inner>, generation: u64, reconnecting: bool) -> Result<()> {
    let url = inner.config.url.clone();
    let timeout = inner.config.connection_timeout;
    debug!("Connecting to {}", url);

    let result = match tokio::time::timeout(timeout, inner.config.connector.connect(&url)).await {
        Ok(result) => result,
        Err(_) => Err(SocketError::Timeout(format!(
            "connection to {} not established within {:?}",
            url, timeout
        ))),
    };

    if inner.generation.load(Ordering::Acquire) != generation {
        debug!("Connection attempt to {} superseded", url);
        return Err(SocketError::Disconnected);
    }

    match result {
        Ok((sink, stream)) => on_open(&inner, generation, sink, stream),
        // waiters on a reconnect that used up the strategy learn it gave up
        Err(e) => match on_attempt_failed(&inner, reconnecting, &e) {
            Some(attempts) => Err(SocketError::ReconnectionFailed { attempts }),
            None => Err(e),
        },
    }
}

/// Enter `Connected`: reset backoff, flush the queue, start the session
fn on_open(inner: &Arc<Inner>, generation: u64, sink: FrameSink, stream: FrameStream) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let flushed = {
        let mut queue = inner.queue.lock();
        if inner.state.transition(Transition::Opened).is_err() {
            debug!("Socket opened after disconnect, dropping it");
            return Err(SocketError::Disconnected);
        }
        inner.reconnect.lock().reset();

        let pending = queue.drain();
        let flushed = pending.len();
        for payload in pending {
            let _ = tx.send(WsMessage::Text(payload));
        }
        *inner.outbound.lock() = Some(tx);
        flushed
    };

    if let Some(tracker) = &inner.pong_tracker {
        tracker.reset();
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *inner.session.lock() = Some(Session {
        shutdown: shutdown_tx,
    });

    info!("Connected to {}", inner.config.url);
    if flushed > 0 {
        info!("Flushing {} queued messages", flushed);
    }
    inner.events.emit(names::CONNECTED, &SocketEvent::Connected);

    let session_inner = Arc::clone(inner);
    tokio::spawn(async move {
        run_session(session_inner, generation, sink, stream, rx, shutdown_rx).await;
    });

    Ok(())
}

/// Returns the attempt count when this failure exhausted the strategy
fn on_attempt_failed(inner: &Arc<Inner>, reconnecting: bool, err: &SocketError) -> Option<u32> {
    error!("Failed to connect to {}: {}", inner.config.url, err);
    inner
        .events
        .emit(names::ERROR, &SocketEvent::Error(err.to_string()));

    if reconnecting && inner.auto_reconnect.load(Ordering::Acquire) {
        if inner.state.transition(Transition::RetryFailed).is_ok() {
            return schedule_reconnect(inner);
        }
    } else if let Err(e) = inner.state.transition(Transition::ConnectFailed) {
        debug!("Ignoring failed attempt: {}", e);
    }
    None
}

/// Main connection loop
async fn run_session(
    inner: Arc<Inner>,
    generation: u64,
    mut sink: FrameSink,
    mut stream: FrameStream,
    mut outbound_rx: mpsc::UnboundedReceiver<WsMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut heartbeat = inner
        .config
        .heartbeat
        .as_ref()
        .map(|(interval, payload)| Heartbeat::new(*interval, payload.clone()));

    let end = loop {
        let heartbeat_due = heartbeat.as_ref().map(Heartbeat::deadline);
        let liveness_due = inner.pong_tracker.as_ref().and_then(PongTracker::deadline);

        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                let close = WsMessage::Close(Some(CloseInfo::new(CLOSE_NORMAL, "client disconnect")));
                if let Err(e) = sink.send(close).await {
                    debug!("Close frame not delivered: {}", e);
                }
                let _ = sink.close().await;
                break SessionEnd::Manual;
            }

            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Close(info))) => {
                    break SessionEnd::Closed(info.unwrap_or_else(|| CloseInfo::new(CLOSE_NO_STATUS, "")));
                }
                Some(Ok(frame)) => {
                    inner.metrics.increment_received();
                    if let Some(heartbeat) = heartbeat.as_mut() {
                        heartbeat.reset();
                    }
                    if let Some(tracker) = &inner.pong_tracker {
                        tracker.record_pong_received();
                    }
                    dispatch_frame(&inner, frame);
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    inner.events.emit(names::ERROR, &SocketEvent::Error(e.to_string()));
                    break SessionEnd::Closed(CloseInfo::new(CLOSE_ABNORMAL, e.to_string()));
                }
                None => {
                    warn!("WebSocket stream closed");
                    break SessionEnd::Closed(CloseInfo::new(CLOSE_ABNORMAL, "stream ended"));
                }
            },

            msg = outbound_rx.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        error!("Failed to send message: {}", e);
                        break SessionEnd::Closed(CloseInfo::new(CLOSE_ABNORMAL, e.to_string()));
                    }
                    inner.metrics.increment_sent();
                }
                None => break SessionEnd::Manual,
            },

            _ = sleep_until_opt(heartbeat_due) => {
                if let Some(heartbeat) = heartbeat.as_mut() {
                    debug!("Heartbeat tick - sending payload");
                    if let Err(e) = sink.send(heartbeat.payload()).await {
                        error!("Failed to send heartbeat: {}", e);
                        break SessionEnd::Closed(CloseInfo::new(CLOSE_ABNORMAL, e.to_string()));
                    }
                    inner.metrics.increment_sent();
                    if let Some(tracker) = &inner.pong_tracker {
                        tracker.record_ping_sent();
                    }
                    heartbeat.reset();
                }
            }

            _ = sleep_until_opt(liveness_due) => {
                warn!("No traffic from {} since last heartbeat, treating connection as lost", inner.config.url);
                break SessionEnd::Closed(CloseInfo::new(CLOSE_ABNORMAL, "heartbeat timeout"));
            }
        }
    };

    on_session_end(&inner, generation, end, &mut outbound_rx);
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Route one inbound frame to subscribers
fn dispatch_frame(inner: &Inner, frame: WsMessage) {
    if inner.config.pong_detector.is_pong(&frame) {
        debug!("Heartbeat acknowledged");
        return;
    }

    match frame {
        WsMessage::Text(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => {
                let message_type = value
                    .get("type")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string);
                if let Some(message_type) = message_type.filter(|t| t != names::MESSAGE) {
                    inner
                        .events
                        .emit(&message_type, &SocketEvent::Message(value.clone()));
                }
                inner.events.emit(names::MESSAGE, &SocketEvent::Message(value));
            }
            Err(e) => {
                debug!("Inbound frame is not JSON ({}), delivering raw", e);
                inner.events.emit(names::MESSAGE, &SocketEvent::Raw(text));
            }
        },
        WsMessage::Binary(data) => {
            inner.events.emit(names::MESSAGE, &SocketEvent::Binary(data));
        }
        WsMessage::Close(_) => {}
    }
}

/// Leave `Connected` after the session loop exits
fn on_session_end(
    inner: &Arc<Inner>,
    generation: u64,
    end: SessionEnd,
    outbound_rx: &mut mpsc::UnboundedReceiver<WsMessage>,
) {
    let current = inner.generation.load(Ordering::Acquire) == generation;

    {
        let mut queue = inner.queue.lock();
        // A newer session may already be live; its sender takes precedence
        let live = if current {
            *inner.outbound.lock() = None;
            None
        } else {
            inner.outbound.lock().clone()
        };

        // Sends accepted but not yet written are handed on or re-queued
        let (mut forwarded, mut requeued) = (0, 0);
        while let Ok(msg) = outbound_rx.try_recv() {
            let WsMessage::Text(payload) = msg else {
                continue;
            };
            let payload = match &live {
                Some(tx) => match tx.send(WsMessage::Text(payload)) {
                    Ok(()) => {
                        forwarded += 1;
                        continue;
                    }
                    Err(mpsc::error::SendError(WsMessage::Text(payload))) => payload,
                    Err(_) => continue,
                },
                None => payload,
            };
            if inner.config.queue_messages {
                if queue.push(payload).is_some() {
                    inner.metrics.increment_dropped();
                }
                requeued += 1;
            }
        }
        if forwarded > 0 {
            debug!("Handed {} unsent messages to the live session", forwarded);
        }
        if requeued > 0 {
            debug!("Re-queued {} unsent messages", requeued);
        }
    }

    let info = match end {
        SessionEnd::Manual => {
            debug!("Session for {} closed by caller", inner.config.url);
            return;
        }
        SessionEnd::Closed(info) => info,
    };

    if !current {
        debug!("Stale session ended, ignoring");
        return;
    }

    let reconnect = !info.is_clean() && inner.auto_reconnect.load(Ordering::Acquire);
    let transition = if reconnect {
        Transition::ConnectionLost
    } else {
        Transition::Closed
    };
    if let Err(e) = inner.state.transition(transition) {
        debug!("Ignoring session end: {}", e);
        return;
    }

    if info.is_clean() {
        info!("Connection to {} closed normally", inner.config.url);
    } else {
        warn!(
            "Connection to {} lost (code {}): {}",
            inner.config.url, info.code, info.reason
        );
    }
    inner.events.emit(
        names::DISCONNECTED,
        &SocketEvent::Disconnected {
            code: info.code,
            reason: info.reason,
        },
    );

    if reconnect {
        schedule_reconnect(inner);
    }
}

/// Arm the backoff timer, or give up when the strategy is exhausted
///
/// Returns the attempt count once reconnection has been abandoned.
fn schedule_reconnect(inner: &Arc<Inner>) -> Option<u32> {
    let next = inner.reconnect.lock().schedule();

    match next {
        NextAttempt::Exhausted { attempts } => {
            if inner.state.transition(Transition::Exhausted).is_err() {
                return None;
            }
            error!(
                "Reconnection to {} abandoned after {} attempts",
                inner.config.url, attempts
            );
            inner
                .events
                .emit(names::RECONNECT_FAILED, &SocketEvent::ReconnectFailed { attempts });
            Some(attempts)
        }
        NextAttempt::After { attempt, delay } => {
            info!("Reconnecting in {:?} (attempt {})", delay, attempt);
            let generation = inner.generation.load(Ordering::Acquire);
            let timer_inner = Arc::clone(inner);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                fire_reconnect(&timer_inner, generation, attempt, delay);
            });
            if let Some(previous) = inner.reconnect_timer.lock().replace(handle) {
                previous.abort();
            }
            None
        }
    }
}

fn fire_reconnect(inner: &Arc<Inner>, generation: u64, attempt: u32, delay: Duration) {
    if inner.generation.load(Ordering::Acquire) != generation
        || !inner.auto_reconnect.load(Ordering::Acquire)
        || !inner.state.is_reconnecting()
    {
        debug!("Reconnect attempt {} cancelled", attempt);
        return;
    }

    inner.metrics.increment_reconnects();
    inner
        .events
        .emit(names::RECONNECTING, &SocketEvent::Reconnecting { attempt, delay });

    let mut slot = inner.attempt.lock();
    if inner.generation.load(Ordering::Acquire) != generation {
        debug!("Reconnect attempt {} superseded by a subscriber", attempt);
        return;
    }
    match begin_attempt(inner, Transition::BackoffElapsed) {
        Ok(attempt_future) => *slot = Some(attempt_future),
        Err(e) => debug!("Reconnect attempt {} skipped: {}", attempt, e),
    }
}
