//! # Socket client core
//!
//! Connection lifecycle, heartbeat, reconnect bookkeeping, the offline
//! queue and event dispatch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use panel_socket::{SocketClient, SocketEvent};
//!
//! #[tokio::main]
//! async fn main() -> panel_socket::Result<()> {
//!     let client = SocketClient::builder()
//!         .url("ws://localhost:8080/ws")
//!         .build()?;
//!
//!     client.on("card_detected", |event| {
//!         println!("card: {:?}", event.as_json());
//!         Ok(())
//!     });
//!
//!     client.connect().await?;
//!     client.send(serde_json::json!({"type": "subscribe", "reader": "r1"}));
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod events;
pub mod heartbeat;
pub mod pong_tracker;
pub mod queue;
pub mod reconnect_state;

// Re-export main types
pub use builder::{states, SocketClientBuilder};
pub use client::{Metrics, SocketClient, SocketSubscription};
pub use config::SocketConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Transition};
pub use events::{EventRegistry, HandlerId, SocketEvent, Subscription};
pub use pong_tracker::PongTracker;
pub use queue::MessageQueue;
pub use reconnect_state::{NextAttempt, ReconnectState};
