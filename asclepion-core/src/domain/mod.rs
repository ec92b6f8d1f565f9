pub mod events;
pub mod session;
pub mod tool;

pub use events::{CloseInfo, LiveEvent, LiveEventKind};
pub use session::SessionConfig;
pub use tool::{FunctionCall, FunctionResponse, ParameterSchema, ParameterSpec, ToolDeclaration};
