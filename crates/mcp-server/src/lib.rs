//! # mcp-server
//!
//! MCP (Model Context Protocol) server for api-bridge.
//! Exposes API doc registration, endpoint search, credential management and
//! whitelisted API calls as tools over a stdio transport.

pub mod protocol;
mod server;
pub mod tools;
pub mod transport;

pub use protocol::{McpError, McpMessage, RequestHandler, ServerCapabilities};
pub use server::McpServer;
pub use tools::{tool_definitions, ToolError, ToolExecutor};
pub use transport::StdioTransport;
