//! MCP request handler

use bridge_core::Gateway;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::types::*;
use crate::tools::{tool_definitions, ToolExecutor};

/// Handler for MCP requests
pub struct RequestHandler {
    tool_executor: ToolExecutor,
    server_name: String,
    server_version: String,
    /// Set once the client sent `initialize`
    initialized: bool,
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::internal_error(e.to_string()))
}

fn parse_params<T: DeserializeOwned + Default>(params: Option<Value>) -> Result<T, McpError> {
    match params {
        Some(params) => serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string())),
        None => Ok(T::default()),
    }
}

impl RequestHandler {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            tool_executor: ToolExecutor::new(gateway),
            server_name: "api-bridge".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Handle an incoming message; notifications and stray responses yield `None`
    pub async fn handle(&mut self, message: McpMessage) -> Option<McpMessage> {
        if message.jsonrpc != JSONRPC_VERSION {
            return Some(McpMessage::error_response(
                message.id,
                McpError::invalid_request(format!("unsupported jsonrpc version '{}'", message.jsonrpc)),
            ));
        }

        let Some(method) = message.method else {
            debug!("Ignoring message without method (response from client)");
            return None;
        };

        let Some(id) = message.id else {
            match method.as_str() {
                "notifications/initialized" | "initialized" => info!("Client initialized"),
                "notifications/cancelled" => debug!("Request cancelled by client"),
                other => debug!("Unknown notification: {}", other),
            }
            return None;
        };

        debug!("Handling request: {}", method);

        let result = match method.as_str() {
            "initialize" => self.handle_initialize(message.params),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&ToolsListResult {
                tools: tool_definitions(),
            }),
            "tools/call" => self.handle_tools_call(message.params).await,
            other => Err(McpError::method_not_found(other)),
        };

        Some(match result {
            Ok(result) => McpMessage::response(id, result),
            Err(error) => McpMessage::error_response(Some(id), error),
        })
    }

    fn handle_initialize(&mut self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = parse_params(params)?;

        match &params.client_info {
            Some(client) => info!("Initializing session with client: {} v{}", client.name, client.version),
            None => info!("Initializing session with unnamed client"),
        }
        if let Some(version) = params.protocol_version.as_deref().filter(|v| *v != MCP_VERSION) {
            debug!("Client requested protocol {}, answering with {}", version, MCP_VERSION);
        }

        self.initialized = true;

        to_result(&InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::with_tools(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::invalid_params(e.to_string()))?
            .ok_or_else(|| McpError::invalid_params("Missing params"))?;

        debug!("Calling tool: {}", params.name);

        let result = match self.tool_executor.execute(&params.name, params.arguments).await {
            Ok(result) => result,
            Err(e) => {
                error!("Tool {} failed: {}", params.name, e);
                ToolCallResult::json(&e.to_payload(), true)
                    .map_err(|e| McpError::internal_error(e.to_string()))?
            }
        };

        to_result(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{MemoryStorage, Settings};
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn handler() -> RequestHandler {
        let gateway = Gateway::with_storage(Arc::new(MemoryStorage::new()), Settings::default())
            .await
            .unwrap();
        RequestHandler::new(Arc::new(gateway))
    }

    async fn call_tool(handler: &mut RequestHandler, name: &str, arguments: Value) -> (bool, Value) {
        let response = handler
            .handle(McpMessage::request(
                1,
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            ))
            .await
            .unwrap();
        let result: ToolCallResult = serde_json::from_value(response.result.unwrap()).unwrap();
        let payload = serde_json::from_str(result.first_text().unwrap()).unwrap();
        (result.is_error.unwrap_or(false), payload)
    }

    fn doc_for(server: &MockServer) -> String {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Orders", "version": "2.0"},
            "servers": [{"url": format!("{}/api", server.uri())}],
            "paths": {
                "/orders/{orderId}": {
                    "get": {
                        "operationId": "getOrder",
                        "summary": "Fetch an order",
                        "parameters": [{"name": "orderId", "in": "path", "required": true, "schema": {"type": "string"}}]
                    }
                }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let mut handler = handler().await;

        let response = handler
            .handle(McpMessage::request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0"}
                })),
            ))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "api-bridge");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(handler.is_initialized());

        assert!(handler
            .handle(McpMessage::notification("notifications/initialized"))
            .await
            .is_none());

        let response = handler
            .handle(McpMessage::request(2, "tools/list", None))
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 11);
        assert!(tools.iter().any(|t| t["name"] == "call_raw_api"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_ping() {
        let mut handler = handler().await;

        let response = handler
            .handle(McpMessage::request(3, "resources/list", None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
        assert_eq!(response.id, Some(json!(3)));

        let response = handler.handle(McpMessage::request(4, "ping", None)).await.unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_tool_errors_are_results() {
        let mut handler = handler().await;

        let (is_error, payload) = call_tool(&mut handler, "no_such_tool", json!({})).await;
        assert!(is_error);
        assert_eq!(payload["error"], "Unknown tool: no_such_tool");

        let (is_error, payload) = call_tool(&mut handler, "remove_api_doc", json!({})).await;
        assert!(is_error);
        assert!(payload["error"].as_str().unwrap().starts_with("Invalid arguments"));

        let response = handler
            .handle(McpMessage::request(5, "tools/call", None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_register_search_and_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders/A-1"))
            .and(header("X-Tenant", "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orderId": "A-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut handler = handler().await;

        let (is_error, payload) =
            call_tool(&mut handler, "add_api_doc", json!({"content": doc_for(&server)})).await;
        assert!(!is_error, "{}", payload);
        let doc_id = payload["apiDoc"]["id"].as_str().unwrap().to_string();

        let (_, payload) = call_tool(&mut handler, "search_endpoints", json!({"query": "order"})).await;
        assert_eq!(payload["endpoints"][0]["operationId"], "getOrder");

        let (is_error, payload) = call_tool(
            &mut handler,
            "get_endpoint",
            json!({"apiDocId": doc_id, "path": "/orders/{orderId}", "method": "get"}),
        )
        .await;
        assert!(!is_error, "{}", payload);
        assert_eq!(payload["endpoint"]["parameters"][0]["name"], "orderId");

        let (is_error, payload) = call_tool(
            &mut handler,
            "add_credential",
            json!({
                "name": "tenant",
                "type": "customHeaders",
                "apiDocId": doc_id,
                "config": {"customHeaders": [{"name": "X-Tenant", "value": "acme"}]}
            }),
        )
        .await;
        assert!(!is_error, "{}", payload);
        assert_eq!(payload["credential"]["config"]["customHeaders"][0]["value"], "****");

        let (is_error, payload) = call_tool(
            &mut handler,
            "call_api",
            json!({"apiDocId": doc_id, "path": "/orders/{orderId}", "pathParams": {"orderId": "A-1"}}),
        )
        .await;
        assert!(!is_error, "{}", payload);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["response"]["status"], 200);
        assert_eq!(payload["response"]["body"]["orderId"], "A-1");
    }

    #[tokio::test]
    async fn test_raw_call_blocked_by_whitelist() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut handler = handler().await;
        let url = format!("{}/admin", server.uri());

        let (is_error, payload) = call_tool(&mut handler, "call_raw_api", json!({"url": url})).await;
        assert!(is_error);
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], format!("URL is not whitelisted: {}", url));
        assert!(payload["suggestion"].as_str().unwrap().contains("add_api_doc"));
    }
}
