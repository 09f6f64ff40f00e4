//! Heartbeat acknowledgement tracker
//!
//! Detects dead/zombie connections: once a heartbeat goes out, some inbound
//! frame must arrive within the configured timeout or the connection is
//! considered lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Tracks heartbeat responses to detect dead connections
///
/// Timestamps are stored as milliseconds since an internal epoch, offset by
/// one so that zero keeps meaning "never".
pub struct PongTracker {
    epoch: Instant,
    last_ping_sent_ms: AtomicU64,
    last_pong_received_ms: AtomicU64,
    timeout: Duration,
}

impl PongTracker {
    /// Create a new tracker
    ///
    /// # Arguments
    /// * `timeout` - How long to wait for traffic after a heartbeat
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_ping_sent_ms: AtomicU64::new(0),
            last_pong_received_ms: AtomicU64::new(0),
            timeout,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 + 1
    }

    /// Record that a heartbeat was just sent
    ///
    /// The deadline stays anchored to the first unanswered heartbeat;
    /// later heartbeats sent before any reply do not move it.
    pub fn record_ping_sent(&self) {
        if self.awaiting_since().is_none() {
            self.last_ping_sent_ms.store(self.now_ms(), Ordering::Release);
        }
    }

    /// Record that the peer just proved it is alive
    pub fn record_pong_received(&self) {
        self.last_pong_received_ms.store(self.now_ms(), Ordering::Release);
    }

    fn awaiting_since(&self) -> Option<u64> {
        let ping_ms = self.last_ping_sent_ms.load(Ordering::Acquire);
        let pong_ms = self.last_pong_received_ms.load(Ordering::Acquire);
        (ping_ms != 0 && pong_ms < ping_ms).then_some(ping_ms)
    }

    /// Check if the connection appears healthy
    ///
    /// Unhealthy only when a heartbeat is outstanding for longer than the
    /// timeout.
    pub fn is_healthy(&self) -> bool {
        match self.awaiting_since() {
            None => true,
            Some(ping_ms) => self.now_ms().saturating_sub(ping_ms) < self.timeout.as_millis() as u64,
        }
    }

    /// Instant at which the outstanding heartbeat expires, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.awaiting_since()
            .map(|ping_ms| self.epoch + Duration::from_millis(ping_ms - 1) + self.timeout)
    }

    /// Get time since the peer was last heard from
    pub fn time_since_last_pong(&self) -> Option<Duration> {
        let pong_ms = self.last_pong_received_ms.load(Ordering::Acquire);
        if pong_ms == 0 {
            return None;
        }
        Some(Duration::from_millis(self.now_ms().saturating_sub(pong_ms)))
    }

    /// Reset the tracker state for a fresh connection
    pub fn reset(&self) {
        self.last_ping_sent_ms.store(0, Ordering::Release);
        self.last_pong_received_ms.store(0, Ordering::Release);
    }
}
