//! # Panel Socket
//!
//! Resilient WebSocket client for the reader dashboard's live channel.
//!
//! ## Features
//!
//! - **Explicit state machine**: `disconnected`, `connecting`, `connected`,
//!   `reconnecting`, with every transition checked
//! - **Exponential backoff**: Growing reconnect delays with an attempt limit
//! - **Heartbeat**: Periodic ping while connected, postponed by inbound traffic
//! - **Offline queue**: Bounded FIFO flushed in order on reconnect
//! - **Event registry**: Named handlers, isolated from each other's failures
//! - **Pluggable socket**: The `Connector` seam swaps the transport in tests

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, events, heartbeat, pong_tracker, queue,
    reconnect_state,
    builder::{states, SocketClientBuilder},
    client::{Metrics, SocketClient, SocketSubscription},
    config::SocketConfig,
    connection_state::{ConnectionState, Transition},
    events::{names, EventRegistry, HandlerId, SocketEvent, Subscription},
    reconnect_state::{NextAttempt, ReconnectState},
};

/// Create a new socket client builder
pub fn builder() -> SocketClientBuilder<states::NoUrl> {
    SocketClientBuilder::new()
}
