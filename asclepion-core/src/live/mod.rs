//! Streaming session client.
//!
//! Owns one duplex connection to the live agent service, transmits the
//! session configuration as the first message, and multiplexes the tagged
//! inbound stream into [`crate::domain::events::LiveEvent`]s delivered to
//! subscribers in strict arrival order.

pub mod client;
pub mod emitter;
pub mod error;
pub mod messages;
pub mod transport;

pub use client::{LiveClient, SessionState};
pub use emitter::{EventEmitter, Subscription};
pub use error::LiveError;
pub use transport::{
    CloseFrame, Connector, TransportError, TransportMessage, TransportSink, TransportStream,
    WsConnector,
};
