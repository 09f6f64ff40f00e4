pub mod states;

use crate::client::SocketClient;
use crate::config::*;
use crate::heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, PING_PAYLOAD};
use crate::queue::DEFAULT_MAX_QUEUE_SIZE;
use crate::traits::*;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for SocketClient
///
/// The URL must be set before `build()` becomes available; everything else
/// has a default:
///
/// | setting              | default                          |
/// |----------------------|----------------------------------|
/// | connector            | tokio-tungstenite                |
/// | heartbeat            | `{"type":"ping"}` every 30s      |
/// | heartbeat timeout    | none                             |
/// | connection timeout   | 10s                              |
/// | reconnect strategy   | 1s x1.5, capped 30s, 10 attempts |
/// | auto reconnect       | on                               |
/// | queue while offline  | on, 100 messages                 |
/// | pong detector        | `{"type":"pong"}`                |
pub struct SocketClientBuilder<U>
where
    U: UrlState,
{
    _state: PhantomData<U>,
    url: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    heartbeat: Option<(Duration, WsMessage)>,
    heartbeat_timeout: Option<Duration>,
    connection_timeout: Duration,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    auto_reconnect: bool,
    queue_messages: bool,
    max_queue_size: usize,
    pong_detector: Option<Arc<dyn PongDetector>>,
}

impl SocketClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            url: None,
            connector: None,
            heartbeat: Some((
                DEFAULT_HEARTBEAT_INTERVAL,
                WsMessage::Text(PING_PAYLOAD.to_string()),
            )),
            heartbeat_timeout: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            reconnect_strategy: None,
            auto_reconnect: true,
            queue_messages: true,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            pong_detector: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> SocketClientBuilder<HasUrl> {
        SocketClientBuilder {
            _state: PhantomData,
            url: Some(url.into()),
            connector: self.connector,
            heartbeat: self.heartbeat,
            heartbeat_timeout: self.heartbeat_timeout,
            connection_timeout: self.connection_timeout,
            reconnect_strategy: self.reconnect_strategy,
            auto_reconnect: self.auto_reconnect,
            queue_messages: self.queue_messages,
            max_queue_size: self.max_queue_size,
            pong_detector: self.pong_detector,
        }
    }
}

impl Default for SocketClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> SocketClientBuilder<U>
where
    U: UrlState,
{
    /// Replace the socket implementation
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Configure heartbeat (interval AND payload required)
    pub fn heartbeat(mut self, interval: Duration, payload: WsMessage) -> Self {
        self.heartbeat = Some((interval, payload));
        self
    }

    /// Keep the default payload, change only the interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat = Some((interval, WsMessage::Text(PING_PAYLOAD.to_string())));
        self
    }

    pub fn disable_heartbeat(mut self) -> Self {
        self.heartbeat = None;
        self
    }

    /// Treat the connection as lost when nothing arrives this long after a heartbeat
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Configure reconnection strategy
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Enable or disable queueing while disconnected
    pub fn queue_messages(mut self, enabled: bool) -> Self {
        self.queue_messages = enabled;
        self
    }

    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    pub fn pong_detector(mut self, detector: impl PongDetector + 'static) -> Self {
        self.pong_detector = Some(Arc::new(detector));
        self
    }
}

impl SocketClientBuilder<HasUrl> {
    /// Validate the settings and create the client
    ///
    /// The client starts `disconnected`; call `connect()` to open it.
    pub fn build(self) -> Result<SocketClient> {
        let url = self
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SocketError::Configuration("URL must not be empty".into()))?;

        if self.connection_timeout.is_zero() {
            return Err(SocketError::Configuration(
                "connection timeout must be greater than zero".into(),
            ));
        }

        if let Some((interval, _)) = &self.heartbeat {
            if interval.is_zero() {
                return Err(SocketError::Configuration(
                    "heartbeat interval must be greater than zero".into(),
                ));
            }
        }

        if self.max_queue_size == 0 {
            return Err(SocketError::Configuration(
                "max queue size must be greater than zero".into(),
            ));
        }

        let strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::new(
                DEFAULT_RECONNECT_INTERVAL,
                DEFAULT_MAX_RECONNECT_INTERVAL,
                Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
            ))
        });

        let config = SocketConfig {
            url,
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(TungsteniteConnector)),
            heartbeat: self.heartbeat,
            heartbeat_timeout: self.heartbeat_timeout,
            connection_timeout: self.connection_timeout,
            auto_reconnect: self.auto_reconnect,
            queue_messages: self.queue_messages,
            max_queue_size: self.max_queue_size,
            pong_detector: self
                .pong_detector
                .unwrap_or_else(|| Arc::new(JsonPongDetector::default())),
        };

        Ok(SocketClient::new(config, strategy))
    }
}
