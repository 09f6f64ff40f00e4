use serde_json::Value;

/// Closure code for a normal, intentional shutdown
pub const CLOSE_NORMAL: u16 = 1000;

/// Closure code reported when the connection vanished without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close frame details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal closure (1000)
    pub fn normal() -> Self {
        Self::new(CLOSE_NORMAL, "")
    }

    /// Whether this closure signals an intentional shutdown
    pub fn is_clean(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}

/// A single WebSocket frame as seen by the client
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseInfo>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Check if message is a close frame
    pub fn is_close(&self) -> bool {
        matches!(self, WsMessage::Close(_))
    }
}

/// Payload accepted by `SocketClient::send`
///
/// Strings are transmitted verbatim, JSON values are serialized first.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Json(Value),
}

impl Outbound {
    /// Serialize into the text frame that goes on the wire
    pub fn into_text(self) -> String {
        match self {
            Outbound::Text(text) => text,
            Outbound::Json(value) => value.to_string(),
        }
    }
}

impl From<&str> for Outbound {
    fn from(text: &str) -> Self {
        Outbound::Text(text.to_string())
    }
}

impl From<String> for Outbound {
    fn from(text: String) -> Self {
        Outbound::Text(text)
    }
}

impl From<Value> for Outbound {
    fn from(value: Value) -> Self {
        Outbound::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_serialization() {
        assert_eq!(Outbound::from("raw text").into_text(), "raw text");
        assert_eq!(
            Outbound::from(json!({"type": "scan", "id": 7})).into_text(),
            r#"{"type":"scan","id":7}"#
        );
    }

    #[test]
    fn test_close_info_cleanliness() {
        assert!(CloseInfo::normal().is_clean());
        assert!(!CloseInfo::new(CLOSE_ABNORMAL, "gone").is_clean());
        assert!(!CloseInfo::new(1011, "server error").is_clean());
    }
}
