//! # Panel Socket Traits
//!
//! Pluggable seams of the socket client:
//!
//! - **Connector**: Open the underlying socket
//! - **ReconnectionStrategy**: Control reconnection delays and limits
//! - **PongDetector**: Recognise heartbeat acknowledgements
//! - **WsMessage** / **Outbound**: Frames in and out

pub mod connector;
pub mod error;
pub mod message;
pub mod pong_detector;
pub mod reconnect;

// Re-export commonly used types
pub use connector::{Connector, FrameSink, FrameStream, TungsteniteConnector};
pub use error::{Result, SocketError};
pub use message::{CloseInfo, Outbound, WsMessage, CLOSE_ABNORMAL, CLOSE_NORMAL};
pub use pong_detector::{JsonPongDetector, NoOpPongDetector, PongDetector};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
