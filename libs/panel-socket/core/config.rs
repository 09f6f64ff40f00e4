use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default time allowed for the socket to open
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default reconnect tunables
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_RECONNECT_INTERVAL: Duration = Duration::from_millis(30_000);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Configuration for SocketClient
///
/// Assembled by the type-state builder; the reconnection strategy is handed
/// straight to the client's reconnect tracker and is not kept here.
pub struct SocketConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Opens the underlying socket
    pub(crate) connector: Arc<dyn Connector>,

    /// Optional heartbeat configuration (interval, payload)
    pub(crate) heartbeat: Option<(Duration, WsMessage)>,

    /// Optional liveness timeout after a heartbeat goes unanswered
    pub(crate) heartbeat_timeout: Option<Duration>,

    /// How long `connect()` waits for the socket to open
    pub(crate) connection_timeout: Duration,

    /// Whether unclean closures schedule reconnects
    pub(crate) auto_reconnect: bool,

    /// Whether sends while disconnected are queued
    pub(crate) queue_messages: bool,

    /// Bound of the outbound queue
    pub(crate) max_queue_size: usize,

    /// Recognises heartbeat acknowledgements
    pub(crate) pong_detector: Arc<dyn PongDetector>,
}

impl SocketConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if heartbeat is configured
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn queue_messages(&self) -> bool {
        self.queue_messages
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }
}
