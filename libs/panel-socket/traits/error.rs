use thiserror::Error;

/// Main error type for panel-socket
///
/// `Clone` so that the outcome of a single connection attempt can be handed
/// to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SocketError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The attempt was superseded by an explicit disconnect
    #[error("Disconnected by caller")]
    Disconnected,

    /// Outbound payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An event handler reported a failure
    #[error("Handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reconnection failed
    #[error("Reconnection failed after {attempts} attempts")]
    ReconnectionFailed { attempts: u32 },

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidState(String),
}

impl SocketError {
    /// Convenience constructor for handler failures
    pub fn handler(message: impl Into<String>) -> Self {
        SocketError::Handler(message.into())
    }
}

impl From<serde_json::Error> for SocketError {
    fn from(e: serde_json::Error) -> Self {
        SocketError::Serialization(e.to_string())
    }
}

/// Result type for panel-socket operations
pub type Result<T> = std::result::Result<T, SocketError>;
