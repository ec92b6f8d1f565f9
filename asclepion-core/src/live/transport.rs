//! Transport seam between the session client and the wire.
//!
//! The production connector speaks WebSocket via tokio-tungstenite; tests
//! substitute an in-memory pair. Both sides exchange [`TransportMessage`]s,
//! so the client never sees tungstenite types directly.

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use std::pin::Pin;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("transport channel closed")]
    ChannelClosed,
}

/// A discrete wire message, either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseFrame>),
}

/// Close code and reason as seen on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

pub type TransportSink = Pin<Box<dyn Sink<TransportMessage, Error = TransportError> + Send>>;
pub type TransportStream =
    Pin<Box<dyn Stream<Item = Result<TransportMessage, TransportError>> + Send>>;

/// Opens one duplex connection and hands back its two halves.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(TransportSink, TransportStream), TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(TransportSink, TransportStream), TransportError> {
        let (socket, _response) = connect_async(url).await?;
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(TransportError::WebSocket)
            .with(|message: TransportMessage| future::ready(Ok::<_, TransportError>(to_ws(message))));
        let stream = stream.filter_map(|item| future::ready(from_ws(item)));

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

fn to_ws(message: TransportMessage) -> Message {
    match message {
        TransportMessage::Text(text) => Message::Text(text),
        TransportMessage::Binary(data) => Message::Binary(data),
        TransportMessage::Close(frame) => Message::Close(frame.map(|f| {
            tungstenite::protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason.into(),
            }
        })),
    }
}

fn from_ws(
    item: Result<Message, tungstenite::Error>,
) -> Option<Result<TransportMessage, TransportError>> {
    match item {
        Ok(Message::Text(text)) => Some(Ok(TransportMessage::Text(text))),
        Ok(Message::Binary(data)) => Some(Ok(TransportMessage::Binary(data))),
        Ok(Message::Close(frame)) => Some(Ok(TransportMessage::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.into_owned(),
        })))),
        // Keepalive frames are handled by the library and carry no payload.
        Ok(_) => None,
        Err(err) => Some(Err(TransportError::WebSocket(err))),
    }
}
