//! PONG Detection Trait
//!
//! Heartbeat acknowledgements arrive as ordinary data frames. The detector
//! picks them out so the client can swallow them instead of forwarding them
//! to consumer handlers.

use crate::traits::WsMessage;

/// Trait for detecting PONG responses in the message stream
pub trait PongDetector: Send + Sync {
    /// Returns true if the message is a heartbeat acknowledgement
    fn is_pong(&self, message: &WsMessage) -> bool;
}

/// Detects JSON frames whose `field` equals `value`
///
/// The default matches `{"type":"pong", ...}`.
#[derive(Debug, Clone)]
pub struct JsonPongDetector {
    field: String,
    value: String,
}

impl JsonPongDetector {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Default for JsonPongDetector {
    fn default() -> Self {
        Self::new("type", "pong")
    }
}

impl PongDetector for JsonPongDetector {
    fn is_pong(&self, message: &WsMessage) -> bool {
        message
            .as_text()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok())
            .and_then(|json| {
                json.get(&self.field)
                    .and_then(|v| v.as_str())
                    .map(|v| v == self.value)
            })
            .unwrap_or(false)
    }
}

/// No-op PONG detector that never detects PONGs
pub struct NoOpPongDetector;

impl PongDetector for NoOpPongDetector {
    fn is_pong(&self, _message: &WsMessage) -> bool {
        false
    }
}
