//! Tool dispatch: bridges agent-issued tool calls to external side effects.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{ResponseChannel, ToolDispatcher};
pub use registry::ToolRegistry;
