//! The duplex session client and its lifecycle state machine.

use super::emitter::{EventEmitter, Subscription};
use super::error::LiveError;
use super::messages::{
    Blob, ClientContent, ClientContentEnvelope, Content, RealtimeInput, RealtimeInputEnvelope,
    ServerMessage, Setup, SetupEnvelope, ToolResponsePayload, ToolResponseEnvelope,
};
use super::transport::{
    CloseFrame, Connector, TransportMessage, TransportSink, TransportStream,
};
use crate::domain::events::{CloseInfo, LiveEvent, LiveEventKind};
use crate::domain::session::SessionConfig;
use crate::domain::tool::FunctionResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// One duplex streaming session against the live agent service.
///
/// `connect` transmits the session configuration as the first message and
/// only then reports the session as open. Inbound messages are re-emitted
/// as [`LiveEvent`]s in strict arrival order.
pub struct LiveClient {
    connector: Arc<dyn Connector>,
    url: String,
    emitter: Arc<EventEmitter>,
    state: Arc<Mutex<SessionState>>,
    sink: Arc<tokio::sync::Mutex<Option<TransportSink>>>,
    closed_emitted: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl LiveClient {
    pub fn new(connector: Arc<dyn Connector>, url: impl Into<String>) -> Self {
        Self {
            connector,
            url: url.into(),
            emitter: EventEmitter::new(),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            sink: Arc::new(tokio::sync::Mutex::new(None)),
            closed_emitted: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state lock")
    }

    /// Registers a listener for one event kind.
    ///
    /// Registration does not replay events that were emitted earlier.
    pub fn subscribe<F>(&self, kind: LiveEventKind, listener: F) -> Subscription
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        self.emitter.subscribe(kind, listener)
    }

    /// Opens the connection and transmits the session configuration.
    ///
    /// Valid from `Idle` or `Closed` only. The configuration is fixed for
    /// the lifetime of the connection; reconfiguring requires a disconnect
    /// and a fresh connect.
    pub async fn connect(&self, config: &SessionConfig) -> Result<(), LiveError> {
        {
            let mut state = self.state.lock().expect("session state lock");
            match *state {
                SessionState::Idle | SessionState::Closed => *state = SessionState::Connecting,
                current => return Err(LiveError::invalid_state("connect", current)),
            }
        }

        let (mut sink, stream) = match self.connector.connect(&self.url).await {
            Ok(halves) => halves,
            Err(err) => {
                self.set_state(SessionState::Errored);
                return Err(LiveError::Transport(err));
            }
        };

        let setup = SetupEnvelope {
            setup: Setup::from_session_config(config),
        };
        let text = serde_json::to_string(&setup).map_err(LiveError::encode)?;
        if let Err(err) = sink.send(TransportMessage::Text(text)).await {
            self.set_state(SessionState::Errored);
            return Err(LiveError::Transport(err));
        }

        *self.sink.lock().await = Some(sink);
        self.closed_emitted.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Open);
        info!(model = config.model.as_str(), "live session open");
        self.emitter.emit(&LiveEvent::Open);

        let handle = tokio::spawn(run_reader(
            stream,
            self.emitter.clone(),
            self.state.clone(),
            self.sink.clone(),
            self.closed_emitted.clone(),
        ));
        if let Some(previous) = self
            .reader
            .lock()
            .expect("reader handle lock")
            .replace(handle)
        {
            previous.abort();
        }

        Ok(())
    }

    /// Sends user content turns. Valid only while `Open`.
    pub async fn send(&self, turns: Vec<Content>, turn_complete: bool) -> Result<(), LiveError> {
        self.ensure_open("send")?;
        self.write_payload(
            "send",
            &ClientContentEnvelope {
                client_content: ClientContent {
                    turns,
                    turn_complete,
                },
            },
        )
        .await
    }

    /// Streams realtime media chunks (e.g. audio). Valid only while `Open`.
    pub async fn send_realtime_input(&self, chunks: Vec<Blob>) -> Result<(), LiveError> {
        self.ensure_open("send_realtime_input")?;
        self.write_payload(
            "send_realtime_input",
            &RealtimeInputEnvelope {
                realtime_input: RealtimeInput {
                    media_chunks: chunks,
                },
            },
        )
        .await
    }

    /// Replies to one or more prior tool calls. Valid only while `Open`.
    pub async fn send_tool_response(
        &self,
        responses: Vec<FunctionResponse>,
    ) -> Result<(), LiveError> {
        self.ensure_open("send_tool_response")?;
        self.write_payload(
            "send_tool_response",
            &ToolResponseEnvelope {
                tool_response: ToolResponsePayload {
                    function_responses: responses,
                },
            },
        )
        .await
    }

    /// Closes the session. Idempotent; valid from any state.
    ///
    /// Exactly one `Closed` event is emitted per connection no matter how
    /// many times this is called or whether the far side closed first.
    pub async fn disconnect(&self) -> Result<(), LiveError> {
        {
            let mut state = self.state.lock().expect("session state lock");
            if matches!(*state, SessionState::Closed) {
                return Ok(());
            }
            // Nothing to close before the first connect; no event either.
            if matches!(*state, SessionState::Idle) {
                *state = SessionState::Closed;
                return Ok(());
            }
            *state = SessionState::Closing;
        }

        if let Some(handle) = self.reader.lock().expect("reader handle lock").take() {
            handle.abort();
        }
        if let Some(mut sink) = self.sink.lock().await.take() {
            let close = TransportMessage::Close(Some(CloseFrame {
                code: 1000,
                reason: "client disconnect".to_string(),
            }));
            if let Err(err) = sink.send(close).await {
                debug!(%err, "close frame not delivered");
            }
            let _ = sink.close().await;
        }

        self.set_state(SessionState::Closed);
        if !self.closed_emitted.swap(true, Ordering::SeqCst) {
            self.emitter.emit(&LiveEvent::Closed(CloseInfo {
                code: 1000,
                reason: "client disconnect".to_string(),
                clean: true,
            }));
        }
        Ok(())
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), LiveError> {
        let state = self.state();
        if state == SessionState::Open {
            Ok(())
        } else {
            Err(LiveError::invalid_state(operation, state))
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().expect("session state lock") = next;
    }

    async fn write_payload<T: Serialize>(
        &self,
        operation: &'static str,
        payload: &T,
    ) -> Result<(), LiveError> {
        let text = serde_json::to_string(payload).map_err(LiveError::encode)?;
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| LiveError::invalid_state(operation, self.state()))?;
        sink.send(TransportMessage::Text(text))
            .await
            .map_err(LiveError::Transport)
    }
}

/// Drains the inbound half, classifying each message and fanning it out.
///
/// Delivery is synchronous per message, so subscriber order always matches
/// wire arrival order.
async fn run_reader(
    mut stream: TransportStream,
    emitter: Arc<EventEmitter>,
    state: Arc<Mutex<SessionState>>,
    sink: Arc<tokio::sync::Mutex<Option<TransportSink>>>,
    closed_emitted: Arc<AtomicBool>,
) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(TransportMessage::Text(text)) => dispatch_payload(&emitter, text.as_bytes()),
            Ok(TransportMessage::Binary(data)) => dispatch_payload(&emitter, &data),
            Ok(TransportMessage::Close(frame)) => {
                let info = frame
                    .map(|f| CloseInfo {
                        code: f.code,
                        reason: f.reason,
                        clean: true,
                    })
                    .unwrap_or(CloseInfo {
                        code: 1005,
                        reason: String::new(),
                        clean: true,
                    });
                finish(&emitter, &state, &sink, &closed_emitted, SessionState::Closed, info).await;
                return;
            }
            Err(err) => {
                warn!(%err, "transport failed");
                let info = CloseInfo {
                    code: 1006,
                    reason: err.to_string(),
                    clean: false,
                };
                finish(&emitter, &state, &sink, &closed_emitted, SessionState::Errored, info).await;
                return;
            }
        }
    }

    // Stream ended without a close frame.
    let info = CloseInfo {
        code: 1006,
        reason: "connection closed without close frame".to_string(),
        clean: false,
    };
    finish(&emitter, &state, &sink, &closed_emitted, SessionState::Closed, info).await;
}

fn dispatch_payload(emitter: &EventEmitter, bytes: &[u8]) {
    let message: ServerMessage = match serde_json::from_slice(bytes) {
        Ok(message) => message,
        Err(err) => {
            emitter.emit(&LiveEvent::Error(format!(
                "malformed server message: {err}"
            )));
            return;
        }
    };

    if message.setup_complete.is_some() {
        debug!("session setup acknowledged");
        return;
    }
    if let Some(content) = message.server_content {
        if content.interrupted {
            emitter.emit(&LiveEvent::Interrupted);
            return;
        }
        // Content first: a chunk and its turn marker can share one message.
        let turn_complete = content.turn_complete;
        if content.model_turn.is_some() {
            emitter.emit(&LiveEvent::Content(content));
        }
        if turn_complete {
            emitter.emit(&LiveEvent::TurnComplete);
        }
        return;
    }
    if let Some(tool_call) = message.tool_call {
        emitter.emit(&LiveEvent::ToolCall(tool_call));
        return;
    }

    emitter.emit(&LiveEvent::Error(
        "unrecognized server message".to_string(),
    ));
}

async fn finish(
    emitter: &EventEmitter,
    state: &Mutex<SessionState>,
    sink: &tokio::sync::Mutex<Option<TransportSink>>,
    closed_emitted: &AtomicBool,
    terminal: SessionState,
    info: CloseInfo,
) {
    sink.lock().await.take();
    *state.lock().expect("session state lock") = terminal;
    if !closed_emitted.swap(true, Ordering::SeqCst) {
        info!(code = info.code, clean = info.clean, "live session closed");
        emitter.emit(&LiveEvent::Closed(info));
    }
}
