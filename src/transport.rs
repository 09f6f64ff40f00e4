//! Transport composition root
//!
//! The dashboard owns exactly one [`HttpClient`] and one [`SocketClient`],
//! built here from [`AppConfig`] and passed to whoever needs them.

use crate::config::AppConfig;
use panel_http::{FileTokenStore, HttpClient, HttpClientConfig, HttpError};
use panel_socket::{ExponentialBackoff, SocketClient, SocketError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] HttpError),

    #[error("Socket client setup failed: {0}")]
    Socket(#[from] SocketError),
}

#[derive(Clone)]
pub struct Transport {
    pub http: HttpClient,
    pub socket: SocketClient,
}

impl Transport {
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let http = build_http(config)?;
        let socket = build_socket(config)?;

        info!(
            "Transport ready: api={} ws={}",
            config.api_base_url, config.ws_url
        );
        Ok(Self { http, socket })
    }

    /// Close the socket and abort every in-flight request
    pub fn shutdown(&self) {
        self.socket.disconnect();
        self.http.cancel_all_requests();
    }
}

fn build_http(config: &AppConfig) -> Result<HttpClient, HttpError> {
    let settings = &config.http;
    let http_config = HttpClientConfig::new(config.api_base_url.clone())
        .timeout(settings.timeout())
        .retries(settings.retries)
        .retry_delay(settings.retry_delay());

    match &settings.token_path {
        Some(path) => HttpClient::with_token_store(http_config, Arc::new(FileTokenStore::new(path))),
        None => HttpClient::new(http_config),
    }
}

fn build_socket(config: &AppConfig) -> Result<SocketClient, SocketError> {
    let settings = &config.socket;
    let strategy = ExponentialBackoff::new(
        settings.reconnect_interval(),
        settings.max_reconnect_interval(),
        Some(settings.max_reconnect_attempts),
    )
    .with_decay(settings.reconnect_decay);

    let mut builder = SocketClient::builder()
        .url(config.ws_url.clone())
        .heartbeat_interval(settings.heartbeat_interval())
        .connection_timeout(settings.connection_timeout())
        .reconnect_strategy(strategy)
        .auto_reconnect(settings.auto_reconnect)
        .queue_messages(settings.queue_messages)
        .max_queue_size(settings.max_queue_size);

    if let Some(timeout) = settings.heartbeat_timeout() {
        builder = builder.heartbeat_timeout(timeout);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_socket::ConnectionState;
    use std::time::Duration;

    #[tokio::test]
    async fn test_from_default_config() {
        let transport = Transport::from_config(&AppConfig::default()).unwrap();

        assert_eq!(transport.http.config().retries, 1);
        assert_eq!(transport.http.config().timeout, Duration::from_secs(30));
        assert_eq!(transport.socket.state(), ConnectionState::Disconnected);
        assert_eq!(transport.socket.config().max_queue_size(), 100);
        assert!(transport.http.auth_token().is_none());
    }

    #[tokio::test]
    async fn test_token_path_loads_persisted_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"auth_token":"tok-123"}"#).unwrap();

        let mut config = AppConfig::default();
        config.http.token_path = Some(path.to_string_lossy().into_owned());

        let transport = Transport::from_config(&config).unwrap();
        assert_eq!(transport.http.auth_token().as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn test_invalid_api_url_rejected() {
        let mut config = AppConfig::default();
        config.api_base_url = "not a url".to_string();

        let err = Transport::from_config(&config).err().unwrap();
        assert!(matches!(err, TransportError::Http(HttpError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_shutdown_leaves_socket_disconnected() {
        let transport = Transport::from_config(&AppConfig::default()).unwrap();
        transport.shutdown();
        assert_eq!(transport.socket.state(), ConnectionState::Disconnected);
        assert_eq!(transport.http.pending_count(), 0);
    }
}
