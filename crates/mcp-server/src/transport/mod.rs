//! Transport implementations for MCP server

mod stdio;

pub use stdio::StdioTransport;
