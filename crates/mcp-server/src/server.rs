//! Main MCP server orchestration

use bridge_core::Gateway;
use std::sync::Arc;
use tracing::info;

use crate::protocol::RequestHandler;
use crate::transport::StdioTransport;

/// MCP server
pub struct McpServer {
    gateway: Arc<Gateway>,
}

impl McpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Run the server on stdio until the client closes stdin
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "Starting MCP server with {} registered API doc(s)",
            self.gateway.api_docs.list().await.len()
        );

        let mut transport = StdioTransport::new(RequestHandler::new(self.gateway.clone()));
        transport.run().await?;
        Ok(())
    }
}
