//! Tool descriptors, local executors, and the per-client tool registry.
//!
//! Executors return [`ToolError::DoNotRespond`] to end a tool-call loop
//! successfully without another model turn.

mod error;
mod registry;
mod tool;

pub use error::{RegistryError, ToolError};
pub use registry::ToolRegistry;
pub use tool::{
    executor, validate_name, Executor, Function, McpServer, Tool, ToolKind, ToolSpec,
};
