//! Execute MCP tools against the gateway

use bridge_core::{
    ApiCallRequest, BridgeError, CredentialUpdate, Gateway, NewCredential, RawApiCallRequest,
};
use openapi_parser::HttpMethod;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::definitions::DEFAULT_SEARCH_LIMIT;
use crate::protocol::ToolCallResult;

/// Tool execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Error payload shown to the agent
    pub fn to_payload(&self) -> Value {
        let suggestion = match self {
            ToolError::Bridge(e) => e.suggestion(),
            ToolError::UnknownTool(_) => Some("Use tools/list to see the available tools.".to_string()),
            _ => None,
        };

        match suggestion {
            Some(suggestion) => json!({"success": false, "error": self.to_string(), "suggestion": suggestion}),
            None => json!({"success": false, "error": self.to_string()}),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddApiDocArgs {
    url: Option<String>,
    content: Option<String>,
    name: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDocIdArgs {
    api_doc_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEndpointsArgs {
    query: String,
    api_doc_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEndpointArgs {
    api_doc_id: String,
    path: String,
    method: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCredentialArgs {
    #[serde(flatten)]
    credential: NewCredential,
    #[serde(default)]
    skip_validity_check: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCredentialArgs {
    credential_id: String,
    #[serde(flatten)]
    update: CredentialUpdate,
    #[serde(default)]
    skip_validity_check: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialIdArgs {
    credential_id: String,
}

fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T, ToolError> {
    let arguments = arguments.unwrap_or_else(|| json!({}));
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Executor for MCP tools
pub struct ToolExecutor {
    gateway: Arc<Gateway>,
}

impl ToolExecutor {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Execute a tool by name
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> Result<ToolCallResult, ToolError> {
        debug!("Executing tool: {}", tool_name);

        match tool_name {
            "add_api_doc" => self.add_api_doc(parse_args(arguments)?).await,
            "list_api_docs" => self.list_api_docs().await,
            "remove_api_doc" => self.remove_api_doc(parse_args(arguments)?).await,
            "search_endpoints" => self.search_endpoints(parse_args(arguments)?).await,
            "get_endpoint" => self.get_endpoint(parse_args(arguments)?).await,
            "add_credential" => self.add_credential(parse_args(arguments)?).await,
            "update_credential" => self.update_credential(parse_args(arguments)?).await,
            "list_credentials" => self.list_credentials().await,
            "delete_credential" => self.delete_credential(parse_args(arguments)?).await,
            "call_api" => {
                let outcome = self.gateway.call_api(parse_args::<ApiCallRequest>(arguments)?).await;
                Ok(ToolCallResult::json(&outcome, !outcome.success)?)
            }
            "call_raw_api" => {
                let outcome = self
                    .gateway
                    .call_raw_api(parse_args::<RawApiCallRequest>(arguments)?)
                    .await;
                Ok(ToolCallResult::json(&outcome, !outcome.success)?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn add_api_doc(&self, args: AddApiDocArgs) -> Result<ToolCallResult, ToolError> {
        let api_docs = &self.gateway.api_docs;
        let doc = match (args.url, args.content) {
            (Some(url), None) => api_docs.add_from_url(&url, args.name, args.base_url).await?,
            (None, Some(content)) => {
                api_docs
                    .add_from_content(&content, args.name, args.base_url)
                    .await?
            }
            _ => {
                return Err(ToolError::InvalidArguments(
                    "provide exactly one of 'url' or 'content'".to_string(),
                ))
            }
        };

        info!("API doc added via MCP: {}", doc.id);
        Ok(ToolCallResult::json(
            &json!({
                "success": true,
                "apiDoc": doc,
                "message": format!("Registered {} endpoints; {} is now whitelisted", doc.endpoint_count, doc.base_url)
            }),
            false,
        )?)
    }

    async fn list_api_docs(&self) -> Result<ToolCallResult, ToolError> {
        let docs = self.gateway.api_docs.list().await;
        Ok(ToolCallResult::json(
            &json!({"success": true, "count": docs.len(), "apiDocs": docs}),
            false,
        )?)
    }

    async fn remove_api_doc(&self, args: ApiDocIdArgs) -> Result<ToolCallResult, ToolError> {
        let removed = self.gateway.remove_api_doc(&args.api_doc_id).await?;
        Ok(ToolCallResult::json(
            &json!({"success": true, "removed": removed}),
            false,
        )?)
    }

    async fn search_endpoints(&self, args: SearchEndpointsArgs) -> Result<ToolCallResult, ToolError> {
        let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1);
        let hits = self
            .gateway
            .api_docs
            .search(&args.query, args.api_doc_id.as_deref(), limit)
            .await?;

        Ok(ToolCallResult::json(
            &json!({"success": true, "count": hits.len(), "endpoints": hits}),
            false,
        )?)
    }

    async fn get_endpoint(&self, args: GetEndpointArgs) -> Result<ToolCallResult, ToolError> {
        let method: HttpMethod = args
            .method
            .parse()
            .map_err(|e: openapi_parser::ParseError| ToolError::InvalidArguments(e.to_string()))?;

        let doc = self.gateway.api_docs.require(&args.api_doc_id).await?;
        let endpoint = self
            .gateway
            .api_docs
            .endpoint_info(&doc.id, &args.path, method)
            .await?
            .ok_or_else(|| BridgeError::EndpointNotFound(format!("{} {}", method, args.path)))?;

        Ok(ToolCallResult::json(
            &json!({
                "success": true,
                "apiDocId": doc.id,
                "baseUrl": doc.base_url,
                "endpoint": endpoint
            }),
            false,
        )?)
    }

    async fn add_credential(&self, args: AddCredentialArgs) -> Result<ToolCallResult, ToolError> {
        let credential = self
            .gateway
            .add_credential(args.credential, args.skip_validity_check)
            .await?;

        Ok(ToolCallResult::json(
            &json!({"success": true, "credential": credential.masked()}),
            false,
        )?)
    }

    async fn update_credential(&self, args: UpdateCredentialArgs) -> Result<ToolCallResult, ToolError> {
        let credential = self
            .gateway
            .update_credential(&args.credential_id, args.update, args.skip_validity_check)
            .await?;

        Ok(ToolCallResult::json(
            &json!({"success": true, "credential": credential.masked()}),
            false,
        )?)
    }

    async fn list_credentials(&self) -> Result<ToolCallResult, ToolError> {
        let credentials = self.gateway.list_credentials().await?;
        Ok(ToolCallResult::json(
            &json!({"success": true, "count": credentials.len(), "credentials": credentials}),
            false,
        )?)
    }

    async fn delete_credential(&self, args: CredentialIdArgs) -> Result<ToolCallResult, ToolError> {
        self.gateway.delete_credential(&args.credential_id).await?;
        Ok(ToolCallResult::json(
            &json!({"success": true, "deleted": args.credential_id}),
            false,
        )?)
    }
}
