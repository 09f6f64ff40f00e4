//! Heartbeat scheduling for WebSocket connections
//!
//! The heartbeat is a deadline owned by the connection loop, not a separate
//! task:
//!
//! ```text
//! connection loop select!
//!   ├─ inbound frame ──> reset()      (deadline = now + interval)
//!   ├─ outbound send
//!   └─ sleep_until(deadline) ──> send payload, reset()
//! ```
//!
//! Any inbound traffic postpones the next ping by the full interval, so an
//! idle-but-alive connection is pinged while a chatty one never is.

use crate::traits::WsMessage;
use std::time::Duration;
use tokio::time::Instant;

/// Literal heartbeat frame
pub const PING_PAYLOAD: &str = r#"{"type":"ping"}"#;

/// Default interval between heartbeats
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Heartbeat configuration plus the next due time
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    payload: WsMessage,
    next_beat: Instant,
}

impl Heartbeat {
    /// Start a heartbeat whose first beat is one interval from now
    pub fn new(interval: Duration, payload: WsMessage) -> Self {
        Self {
            interval,
            payload,
            next_beat: Instant::now() + interval,
        }
    }

    /// Standard `{"type":"ping"}` heartbeat
    pub fn ping(interval: Duration) -> Self {
        Self::new(interval, WsMessage::Text(PING_PAYLOAD.to_string()))
    }

    /// Push the next beat a full interval into the future
    pub fn reset(&mut self) {
        self.next_beat = Instant::now() + self.interval;
    }

    pub fn deadline(&self) -> Instant {
        self.next_beat
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn payload(&self) -> WsMessage {
        self.payload.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reset_postpones_deadline() {
        let mut heartbeat = Heartbeat::ping(Duration::from_secs(30));
        let first = heartbeat.deadline();

        tokio::time::advance(Duration::from_secs(20)).await;
        heartbeat.reset();

        assert_eq!(heartbeat.deadline() - first, Duration::from_secs(20));
        assert_eq!(heartbeat.deadline() - Instant::now(), Duration::from_secs(30));
    }

    #[test]
    fn test_ping_payload() {
        let heartbeat = Heartbeat::ping(DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(heartbeat.payload(), WsMessage::Text(r#"{"type":"ping"}"#.to_string()));
    }
}
