//! Tool definitions and execution

mod definitions;
mod executor;

pub use definitions::{tool_definitions, DEFAULT_SEARCH_LIMIT};
pub use executor::{ToolError, ToolExecutor};
