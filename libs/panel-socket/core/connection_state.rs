//! Connection state machine
//!
//! ```text
//! Disconnected | Reconnecting --Connect--------> Connecting
//! Reconnecting ----------------BackoffElapsed--> Connecting
//! Connecting   ----------------Opened----------> Connected
//! Connecting   ----------------ConnectFailed---> Disconnected
//! Connecting   ----------------RetryFailed-----> Reconnecting
//! Connected    ----------------ConnectionLost--> Reconnecting
//! Connected | Connecting | Reconnecting --Closed--> Disconnected
//! Reconnecting ----------------Exhausted-------> Disconnected
//! any          ----------------ManualDisconnect-> Disconnected
//! ```
//!
//! Every mutation goes through [`ConnectionState::apply`], so the legal
//! transitions live in one exhaustive match.

use crate::traits::{Result, SocketError};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of the logical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Resolve the state reached by `transition`, or `None` if illegal
    pub fn apply(self, transition: Transition) -> Option<ConnectionState> {
        use ConnectionState::*;
        use Transition::*;

        match (self, transition) {
            (Disconnected, Connect) | (Reconnecting, Connect) => Some(Connecting),
            (Reconnecting, BackoffElapsed) => Some(Connecting),
            (Connecting, Opened) => Some(Connected),
            (Connecting, ConnectFailed) => Some(Disconnected),
            (Connecting, RetryFailed) => Some(Reconnecting),
            (Connected, ConnectionLost) => Some(Reconnecting),
            (Connected, Closed) | (Connecting, Closed) | (Reconnecting, Closed) => {
                Some(Disconnected)
            }
            (Reconnecting, Exhausted) => Some(Disconnected),
            (_, ManualDisconnect) => Some(Disconnected),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triggers that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Caller invoked `connect()`
    Connect,
    /// Backoff timer fired
    BackoffElapsed,
    /// Underlying socket opened before the connection timeout
    Opened,
    /// Explicit connect attempt timed out or errored
    ConnectFailed,
    /// Reconnect-driven attempt timed out or errored
    RetryFailed,
    /// Socket closed with a non-normal code while auto-reconnect is on
    ConnectionLost,
    /// Clean closure, or any closure with auto-reconnect off
    Closed,
    /// Reconnect attempts reached the configured maximum
    Exhausted,
    /// Caller invoked `disconnect()`
    ManualDisconnect,
}

/// Lock-free holder for the current [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Apply a transition atomically
    ///
    /// Returns `(previous, next)` on success and leaves the state untouched
    /// when the transition is not legal from the current state.
    pub fn transition(&self, transition: Transition) -> Result<(ConnectionState, ConnectionState)> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = ConnectionState::from_u8(current);
            let to = from.apply(transition).ok_or_else(|| {
                SocketError::InvalidState(format!("{:?} is not allowed from {}", transition, from))
            })?;

            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok((from, to)),
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    #[inline]
    pub fn is_disconnected(&self) -> bool {
        self.get() == ConnectionState::Disconnected
    }

    #[inline]
    pub fn is_reconnecting(&self) -> bool {
        self.get() == ConnectionState::Reconnecting
    }
}

/// Atomic counters exposed for status displays
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_queued: AtomicU64,
    messages_dropped: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_queued(&self) -> u64 {
        self.messages_queued.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}
