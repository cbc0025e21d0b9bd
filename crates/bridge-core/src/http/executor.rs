//! Outbound request execution with a single auth retry

use chrono::Utc;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::response::{flatten_headers, read_body, ApiResponse, Timing};
use crate::auth::TokenManager;
use crate::credential::{AuthScheme, Credential};
use crate::error::{BridgeError, Result};

/// A fully resolved outbound request, before authentication
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

/// Sends requests, applying credentials and retrying once on a rejected token
pub struct RequestExecutor {
    client: Client,
    tokens: Arc<TokenManager>,
}

impl RequestExecutor {
    pub fn new(client: Client, tokens: Arc<TokenManager>) -> Self {
        Self { client, tokens }
    }

    /// Authenticate with `credential` (if any) and send `request`.
    ///
    /// For Smart Bearer credentials a response whose status is in
    /// `invalidStatusCodes` evicts the token, renews it and sends the request
    /// exactly once more; the second response is returned as is.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
        credential: Option<&Credential>,
    ) -> Result<ApiResponse> {
        let mut headers = request.headers.clone();
        let scheme = match credential {
            Some(credential) => {
                let scheme = credential.scheme()?;
                scheme.apply(&credential.id, &mut headers, &self.tokens).await?;
                Some((credential.id.as_str(), scheme))
            }
            None => None,
        };

        let response = self.send(request, &headers).await?;

        let Some((credential_id, AuthScheme::SmartBearer(smart))) = scheme else {
            return Ok(response);
        };
        if !smart.is_invalid_status(response.status) {
            return Ok(response);
        }

        info!(
            "{} {} returned {}, renewing token for credential {} and retrying",
            request.method, request.url, response.status, credential_id
        );

        let stale = self.tokens.invalidate(credential_id).await;
        let token = self.tokens.renew(credential_id, &smart, stale).await?;

        let mut retry_headers = request.headers.clone();
        retry_headers.insert(smart.token_header.clone(), smart.header_value(&token));

        self.send(request, &retry_headers).await
    }

    async fn send(
        &self,
        request: &OutboundRequest,
        headers: &HashMap<String, String>,
    ) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let sends_body = request.method != Method::GET && request.method != Method::HEAD;
        match &request.body {
            Some(Value::String(raw)) if sends_body => {
                builder = builder.body(raw.clone());
            }
            Some(body) if sends_body => {
                let has_content_type = headers
                    .keys()
                    .any(|k| k.eq_ignore_ascii_case("content-type"));
                if !has_content_type {
                    builder = builder.header("Content-Type", "application/json");
                }
                builder = builder.body(serde_json::to_vec(body)?);
            }
            _ => {}
        }

        debug!("Sending {} {}", request.method, request.url);
        let start = Utc::now().timestamp_millis();
        let started = Instant::now();

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                BridgeError::InvalidRequest(e.to_string())
            } else {
                BridgeError::Network(e.to_string())
            }
        })?;

        let end = Utc::now().timestamp_millis();
        let duration = started.elapsed().as_millis() as u64;

        let status = response.status();
        let response_headers = flatten_headers(response.headers());
        let body = read_body(response).await;

        debug!("{} {} -> {} in {}ms", request.method, request.url, status.as_u16(), duration);

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: response_headers,
            body,
            timing: Timing {
                start,
                end,
                duration,
            },
        })
    }
}
