//! Inbound event union surfaced by the live session client.

use crate::live::messages::{ServerContent, ToolCallEvent};

/// Close details carried by [`LiveEvent::Closed`].
#[derive(Debug, Clone, PartialEq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    pub clean: bool,
}

/// Tagged union of everything a session can emit to its subscribers.
///
/// Events are produced in strict wire-arrival order and consumed once per
/// registered listener; nothing is persisted or replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The connection is open and the session configuration was transmitted.
    Open,
    /// The transport closed, whether locally, remotely, or through failure.
    Closed(CloseInfo),
    /// A content chunk from the agent (text or inline audio parts).
    Content(ServerContent),
    /// The agent requests one or more tool invocations.
    ToolCall(ToolCallEvent),
    /// The agent finished its turn.
    TurnComplete,
    /// The agent's turn was interrupted.
    Interrupted,
    /// A protocol violation: malformed or unrecognized inbound message.
    Error(String),
}

impl LiveEvent {
    pub fn kind(&self) -> LiveEventKind {
        match self {
            LiveEvent::Open => LiveEventKind::Open,
            LiveEvent::Closed(_) => LiveEventKind::Closed,
            LiveEvent::Content(_) => LiveEventKind::Content,
            LiveEvent::ToolCall(_) => LiveEventKind::ToolCall,
            LiveEvent::TurnComplete => LiveEventKind::TurnComplete,
            LiveEvent::Interrupted => LiveEventKind::Interrupted,
            LiveEvent::Error(_) => LiveEventKind::Error,
        }
    }
}

/// Discriminant used when subscribing to a single event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveEventKind {
    Open,
    Closed,
    Content,
    ToolCall,
    TurnComplete,
    Interrupted,
    Error,
}
