//! Connection Seam
//!
//! The client never touches a socket library directly. It asks a
//! [`Connector`] for a sink/stream pair of [`WsMessage`] frames, which lets the
//! production build run on tokio-tungstenite while tests drive the state
//! machine through in-memory channels.

use crate::traits::{CloseInfo, Result, SocketError, WsMessage};
use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

/// Closure code browsers report when the peer closed without a status
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Outbound half of an open connection
pub type FrameSink = Pin<Box<dyn Sink<WsMessage, Error = SocketError> + Send>>;

/// Inbound half of an open connection
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<WsMessage>> + Send>>;

/// Opens the underlying socket
///
/// A returned pair means the socket is open; the caller owns both halves
/// until the connection ends.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream)>;
}

/// Default connector backed by tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream)> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(map_ws_error)?;

        debug!("WebSocket handshake with {} complete", url);

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(map_ws_error)
            .with(|msg: WsMessage| future::ready(Ok::<_, SocketError>(ws_message_to_tungstenite(msg))));

        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(msg) => tungstenite_to_ws_message(msg).map(Ok),
                Err(e) => Some(Err(map_ws_error(e))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

/// Writes or reads on a socket that is already shut become `ConnectionClosed`
fn map_ws_error(e: WsError) -> SocketError {
    match &e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => SocketError::ConnectionClosed(e.to_string()),
        _ => SocketError::WebSocket(e.to_string()),
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
        WsMessage::Close(info) => Message::Close(info.map(|info| CloseFrame {
            code: CloseCode::from(info.code),
            reason: info.reason.into(),
        })),
    }
}

/// Convert tungstenite Message to WsMessage
///
/// Protocol-level ping/pong frames are answered by tungstenite itself and
/// never reach the client.
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Close(frame) => Some(WsMessage::Close(Some(match frame {
            Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.to_string()),
            None => CloseInfo::new(CLOSE_NO_STATUS, ""),
        }))),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
