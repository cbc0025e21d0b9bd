//! Main gateway orchestration
//!
//! Ties the stores, token lifecycle and request executor together behind the
//! operations the MCP tools expose. Call operations never return `Err`; every
//! failure is folded into a `CallOutcome`.

use openapi_parser::HttpMethod;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::apidoc::{ApiDoc, ApiDocRegistry};
use crate::auth::{TokenCache, TokenManager};
use crate::credential::{
    parse_method, validate_credential, Credential, CredentialManager, CredentialUpdate, NewCredential,
};
use crate::error::{BridgeError, Result};
use crate::http::{ApiResponse, OutboundRequest, RequestExecutor};
use crate::settings::Settings;
use crate::storage::{JsonFileStorage, Storage};
use crate::whitelist;

fn default_method() -> String {
    "GET".to_string()
}

/// Call to an endpoint of a registered API doc
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallRequest {
    pub api_doc_id: String,
    /// Path template or concrete path, relative to the doc's base URL
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub path_params: HashMap<String, Value>,
    #[serde(default)]
    pub query_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Defaults to the first credential bound to the doc
    #[serde(default)]
    pub credential_id: Option<String>,
}

/// Call to an absolute URL, which must fall under a registered base URL
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiCallRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub query_params: BTreeMap<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub credential_id: Option<String>,
}

/// Response summary returned to the agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    /// Milliseconds
    pub duration: u64,
}

impl From<ApiResponse> for CallResponse {
    fn from(response: ApiResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
            duration: response.timing.duration,
        }
    }
}

/// Result of `call_api` / `call_raw_api`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CallResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CallOutcome {
    fn completed(response: ApiResponse) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
            suggestion: None,
        }
    }

    fn failed(err: &BridgeError) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(err.to_string()),
            suggestion: err.suggestion(),
        }
    }
}

/// Main gateway struct that orchestrates all functionality
pub struct Gateway {
    settings: Settings,
    /// Credential store
    pub credentials: CredentialManager,
    /// Registered API docs (also the URL whitelist)
    pub api_docs: ApiDocRegistry,
    tokens: Arc<TokenManager>,
    executor: RequestExecutor,
}

impl Gateway {
    /// Open the gateway on the JSON store in `data_dir`
    pub async fn open(data_dir: &Path, settings: Settings) -> Result<Self> {
        let storage = Arc::new(JsonFileStorage::open(data_dir).await?);
        Self::with_storage(storage, settings).await
    }

    /// Create a gateway over any storage backend (memory storage in tests)
    pub async fn with_storage(storage: Arc<dyn Storage>, settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| BridgeError::Network(format!("failed to build HTTP client: {}", e)))?;

        let tokens = Arc::new(TokenManager::new(
            client.clone(),
            Arc::new(TokenCache::new()),
            settings.error_preview_chars,
        ));
        let executor = RequestExecutor::new(client, tokens.clone());

        let api_docs = ApiDocRegistry::new(storage.clone());
        api_docs.load().await?;
        let credentials = CredentialManager::new(storage.clone());

        info!("Gateway ready ({})", storage.backend_name());

        Ok(Self {
            settings,
            credentials,
            api_docs,
            tokens,
            executor,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // === Credentials ===

    /// Create a credential after admission checks.
    ///
    /// Smart Bearer credentials are verified with a test login unless
    /// `skip_validity_check` is set.
    pub async fn add_credential(
        &self,
        input: NewCredential,
        skip_validity_check: bool,
    ) -> Result<Credential> {
        if let Some(doc_id) = &input.api_doc_id {
            self.api_docs.require(doc_id).await?;
        }

        let credential = Credential::new(input);
        self.admit(&credential, skip_validity_check).await?;
        self.credentials.save(&credential).await?;

        info!(
            "Added {} credential '{}' ({})",
            credential.credential_type, credential.name, credential.id
        );
        Ok(credential)
    }

    /// Apply a partial update after admission checks and evict the cached token
    pub async fn update_credential(
        &self,
        id: &str,
        update: CredentialUpdate,
        skip_validity_check: bool,
    ) -> Result<Credential> {
        let mut credential = self.credentials.require(id).await?;
        update.apply_to(&mut credential)?;

        // Only a new binding must point at a registered doc
        if let Some(doc_id) = update.api_doc_id.as_deref().filter(|id| !id.is_empty()) {
            self.api_docs.require(doc_id).await?;
        }

        self.admit(&credential, skip_validity_check).await?;
        self.credentials.save(&credential).await?;
        self.tokens.invalidate(id).await;

        info!("Updated credential '{}' ({})", credential.name, credential.id);
        Ok(credential)
    }

    /// Remove an API doc and unbind the credentials that defaulted to it
    pub async fn remove_api_doc(&self, id: &str) -> Result<ApiDoc> {
        let removed = self.api_docs.remove(id).await?;
        let unbound = self.credentials.unbind_doc(id).await?;
        if unbound > 0 {
            info!("Unbound {} credential(s) from removed API doc {}", unbound, id);
        }
        Ok(removed)
    }

    /// Delete a credential and forget its cached token
    pub async fn delete_credential(&self, id: &str) -> Result<()> {
        self.credentials.delete(id).await?;
        self.tokens.invalidate(id).await;
        Ok(())
    }

    /// All credentials with secrets masked
    pub async fn list_credentials(&self) -> Result<Vec<Credential>> {
        Ok(self
            .credentials
            .list()
            .await?
            .iter()
            .map(Credential::masked)
            .collect())
    }

    async fn admit(&self, credential: &Credential, skip_validity_check: bool) -> Result<()> {
        validate_credential(credential)?;

        let Some(smart) = credential.smart_bearer()? else {
            return Ok(());
        };
        if skip_validity_check {
            debug!("Skipping login verification for credential {}", credential.id);
            return Ok(());
        }

        self.tokens
            .test_login(&smart)
            .await
            .map_err(|e| BridgeError::VerificationFailed(e.to_string()))?;

        debug!("Login verification succeeded for credential {}", credential.id);
        Ok(())
    }

    // === Calls ===

    /// Call an endpoint of a registered API doc
    pub async fn call_api(&self, request: ApiCallRequest) -> CallOutcome {
        match self.try_call_api(request).await {
            Ok(response) => CallOutcome::completed(response),
            Err(e) => {
                warn!("call_api failed: {}", e);
                CallOutcome::failed(&e)
            }
        }
    }

    /// Call a whitelisted absolute URL
    pub async fn call_raw_api(&self, request: RawApiCallRequest) -> CallOutcome {
        match self.try_call_raw_api(request).await {
            Ok(response) => CallOutcome::completed(response),
            Err(e) => {
                warn!("call_raw_api failed: {}", e);
                CallOutcome::failed(&e)
            }
        }
    }

    async fn try_call_api(&self, request: ApiCallRequest) -> Result<ApiResponse> {
        let doc = self.api_docs.require(&request.api_doc_id).await?;
        let method = request_method(&request.method)?;

        if let Ok(documented) = request.method.parse::<HttpMethod>() {
            let endpoint = self
                .api_docs
                .endpoint_info(&doc.id, &request.path, documented)
                .await?;
            if endpoint.is_none() {
                warn!(
                    "{} {} is not documented in '{}', calling it anyway",
                    documented, request.path, doc.name
                );
            }
        }

        let path = substitute_path_params(&request.path, &request.path_params)?;
        let joined = format!(
            "{}/{}",
            doc.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", joined, e)))?;

        // Paths like "/../" can climb out of the base URL
        self.authorize(url.as_str()).await?;
        append_query(&mut url, &request.query_params);

        let credential = match &request.credential_id {
            Some(id) => Some(self.credentials.require(id).await?),
            None => self.credentials.find_for_doc(&doc.id).await?,
        };

        let outbound = OutboundRequest {
            url,
            method,
            headers: request.headers,
            body: request.body,
        };
        self.executor.execute(&outbound, credential.as_ref()).await
    }

    async fn try_call_raw_api(&self, request: RawApiCallRequest) -> Result<ApiResponse> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        self.authorize(&request.url).await?;

        let method = request_method(&request.method)?;
        append_query(&mut url, &request.query_params);

        let credential = match &request.credential_id {
            Some(id) => Some(self.credentials.require(id).await?),
            None => None,
        };

        let outbound = OutboundRequest {
            url,
            method,
            headers: request.headers,
            body: request.body,
        };
        self.executor.execute(&outbound, credential.as_ref()).await
    }

    async fn authorize(&self, url: &str) -> Result<()> {
        let whitelist = self.api_docs.whitelisted_base_urls().await;
        let result = whitelist::validate(url, &whitelist);

        match result.matched_base_url {
            Some(base) if result.valid => {
                debug!("{} allowed by whitelist entry {}", url, base);
                Ok(())
            }
            _ => {
                warn!("Blocked request to non-whitelisted URL {}", url);
                Err(BridgeError::NotWhitelisted {
                    url: url.to_string(),
                    whitelist,
                })
            }
        }
    }
}

fn request_method(raw: &str) -> Result<reqwest::Method> {
    parse_method(raw).map_err(|_| BridgeError::InvalidRequest(format!("invalid HTTP method '{}'", raw)))
}

/// Render a JSON parameter value the way it appears in a URL
fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace `{name}` placeholders; every placeholder must be supplied
fn substitute_path_params(template: &str, params: &HashMap<String, Value>) -> Result<String> {
    let mut path = template.to_string();
    for (name, value) in params {
        path = path.replace(&format!("{{{}}}", name), &param_string(value));
    }

    if let Some(start) = path.find('{') {
        if let Some(len) = path[start..].find('}') {
            return Err(BridgeError::InvalidRequest(format!(
                "missing path parameter {} for {}",
                &path[start..=start + len],
                template
            )));
        }
    }
    Ok(path)
}

/// Append query parameters; arrays repeat the key and nulls are skipped
fn append_query(url: &mut Url, params: &BTreeMap<String, Value>) {
    let writes_pair = params.values().any(|value| match value {
        Value::Null => false,
        Value::Array(items) => items.iter().any(|v| !v.is_null()),
        _ => true,
    });
    if !writes_pair {
        return;
    }

    let mut pairs = url.query_pairs_mut();
    for (name, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.append_pair(name, &param_string(item));
                }
            }
            other => {
                pairs.append_pair(name, &param_string(other));
            }
        }
    }
}
