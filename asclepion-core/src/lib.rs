//! Core library for the asclepion live agent client.
//!
//! Pairs a duplex streaming session against a multimodal agent service with
//! a tool dispatcher that bridges agent-issued tool calls to a
//! clinical-records API.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod domain;
pub mod infrastructure;
pub mod live;

pub use config::{AppConfig, ConfigError};
pub use dispatch::{ResponseChannel, ToolDispatcher, ToolRegistry};
pub use domain::events::{CloseInfo, LiveEvent, LiveEventKind};
pub use domain::session::SessionConfig;
pub use domain::tool::{FunctionCall, FunctionResponse, ToolDeclaration};
pub use infrastructure::{EhrClient, HttpTokenProvider};
pub use live::messages::{Blob, Content, Part};
pub use live::{LiveClient, LiveError, SessionState, WsConnector};
