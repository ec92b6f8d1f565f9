use super::client::SessionState;
use super::transport::TransportError;
use thiserror::Error;

/// Errors surfaced to callers of the session client.
///
/// Transport closures and protocol violations are reported through events,
/// not through this type; these are the synchronous rejections.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("operation '{operation}' is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode outbound message: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl LiveError {
    pub fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    pub fn encode(source: serde_json::Error) -> Self {
        Self::Encode { source }
    }
}
