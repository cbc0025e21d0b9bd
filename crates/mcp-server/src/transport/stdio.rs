//! stdio transport for MCP (used by desktop agents)

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::protocol::{McpError, McpMessage, RequestHandler};

/// Line-delimited JSON-RPC over stdin/stdout
pub struct StdioTransport {
    handler: RequestHandler,
}

impl StdioTransport {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until EOF
    pub async fn run(&mut self) -> io::Result<()> {
        info!("Starting MCP server on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve one message per line from `reader`, answering on `writer`
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();

            if reader.read_line(&mut line).await? == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!("Received: {}", trimmed);

            let response = match serde_json::from_str::<McpMessage>(trimmed) {
                Ok(message) => self.handler.handle(message).await,
                Err(e) => {
                    error!("Failed to parse message: {}", e);
                    Some(McpMessage::error_response(None, McpError::parse_error()))
                }
            };

            if let Some(response) = response {
                write_message(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &McpMessage) -> io::Result<()> {
    let line = serde_json::to_string(message)?;
    debug!("Sending: {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
