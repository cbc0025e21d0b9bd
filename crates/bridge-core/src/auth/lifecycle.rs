//! Smart Bearer token lifecycle: login, validity probe and refresh

use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::{CachedToken, TokenCache};
use super::path::get_value_by_path;
use crate::credential::SmartBearerConfig;
use crate::error::{BridgeError, Result};

/// Characters of a response shown when the token path is missing
const TOKEN_PREVIEW_CHARS: usize = 200;

/// Tokens parsed out of a login or refresh response
struct IssuedTokens {
    token: String,
    refresh_token: Option<String>,
}

/// Obtains, validates and renews tokens for Smart Bearer credentials
pub struct TokenManager {
    client: Client,
    cache: Arc<TokenCache>,
    error_preview_chars: usize,
}

impl TokenManager {
    pub fn new(client: Client, cache: Arc<TokenCache>, error_preview_chars: usize) -> Self {
        Self {
            client,
            cache,
            error_preview_chars,
        }
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Current token for `credential_id`, logging in or refreshing as needed
    pub async fn obtain_token(&self, credential_id: &str, smart: &SmartBearerConfig) -> Result<String> {
        let Some(cached) = self.cache.get(credential_id).await else {
            debug!("No cached token for credential {}", credential_id);
            return self.renew(credential_id, smart, None).await;
        };

        if self.is_token_valid(smart, &cached.token).await {
            debug!("Using cached token for credential {}", credential_id);
            return Ok(cached.token.clone());
        }

        info!("Cached token for credential {} is no longer valid", credential_id);
        let stale = self.invalidate(credential_id).await.or(Some(cached));
        self.renew(credential_id, smart, stale).await
    }

    /// Evict the cached token, returning it
    pub async fn invalidate(&self, credential_id: &str) -> Option<CachedToken> {
        let evicted = self.cache.delete(credential_id).await;
        if evicted.is_some() {
            debug!("Evicted cached token for credential {}", credential_id);
        }
        evicted
    }

    /// Get a fresh token: refresh when possible, otherwise log in.
    ///
    /// `stale` is the evicted entry whose refresh token may be used.
    pub async fn renew(
        &self,
        credential_id: &str,
        smart: &SmartBearerConfig,
        stale: Option<CachedToken>,
    ) -> Result<String> {
        let refresh_token = stale.as_ref().and_then(|s| s.refresh_token.as_deref());

        if let (Some(_), Some(refresh_token)) = (&smart.refresh_url, refresh_token) {
            match self.refresh(credential_id, smart, refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => warn!(
                    "Token refresh failed for credential {}, falling back to login: {}",
                    credential_id, e
                ),
            }
        }

        self.login(credential_id, smart).await
    }

    /// Log in and cache the resulting token
    pub async fn login(&self, credential_id: &str, smart: &SmartBearerConfig) -> Result<String> {
        let issued = self.request_login(smart).await?;
        let token = issued.token.clone();

        self.cache
            .set(CachedToken::new(credential_id, issued.token, issued.refresh_token))
            .await;

        info!("Logged in for credential {}", credential_id);
        Ok(token)
    }

    /// Log in without touching the cache; used to verify a configuration
    pub async fn test_login(&self, smart: &SmartBearerConfig) -> Result<String> {
        self.request_login(smart).await.map(|issued| issued.token)
    }

    /// Exchange `refresh_token` for a new access token and cache it
    pub async fn refresh(
        &self,
        credential_id: &str,
        smart: &SmartBearerConfig,
        refresh_token: &str,
    ) -> Result<String> {
        let refresh_url = smart.refresh_url.as_deref().ok_or_else(|| {
            BridgeError::Configuration("refreshUrl is not configured".to_string())
        })?;

        let mut body = Map::new();
        body.insert(
            smart.refresh_token_field.clone(),
            Value::String(refresh_token.to_string()),
        );
        if let Some(Value::Object(extra)) = &smart.refresh_body {
            body.extend(extra.clone());
        }

        let request = self.json_request(
            &smart.refresh_method,
            refresh_url,
            &smart.login_headers,
            Some(&Value::Object(body)),
        );
        let payload = self.send_for_json(request, "refresh").await?;
        let issued = extract_tokens(&payload, smart, true)?;

        // Servers that do not rotate refresh tokens keep the old one valid
        let refresh_token = issued
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));
        let token = issued.token.clone();
        self.cache
            .set(CachedToken::new(credential_id, issued.token, refresh_token))
            .await;

        info!("Refreshed token for credential {}", credential_id);
        Ok(token)
    }

    /// Probe the validity endpoint; without one, a cached token is assumed valid
    async fn is_token_valid(&self, smart: &SmartBearerConfig, token: &str) -> bool {
        let Some(url) = smart.validity_check_url.as_deref() else {
            return true;
        };

        let result = self
            .client
            .request(smart.validity_check_method.clone(), url)
            .header(smart.token_header.as_str(), smart.header_value(token))
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!("Validity check returned {}", status);
                !smart.is_invalid_status(status)
            }
            Err(e) => {
                warn!("Validity check request failed: {}", e);
                false
            }
        }
    }

    async fn request_login(&self, smart: &SmartBearerConfig) -> Result<IssuedTokens> {
        let request = self.json_request(
            &smart.login_method,
            &smart.login_url,
            &smart.login_headers,
            smart.login_body.as_ref(),
        );
        let payload = self.send_for_json(request, "login").await?;
        extract_tokens(&payload, smart, smart.refresh_url.is_some())
    }

    /// JSON request with `extra_headers` layered over the JSON defaults.
    /// The body is dropped for GET.
    fn json_request(
        &self,
        method: &Method,
        url: &str,
        extra_headers: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> RequestBuilder {
        let mut headers: HashMap<&str, &str> = HashMap::from([
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
        ]);
        for (name, value) in extra_headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.as_str(), value.as_str());
        }

        let mut request = self.client.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        match body {
            Some(body) if *method != Method::GET => request.body(body.to_string()),
            _ => request,
        }
    }

    async fn send_for_json(&self, request: RequestBuilder, action: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                BridgeError::Configuration(format!("invalid {} request: {}", action, e))
            } else {
                BridgeError::Network(format!("{} request failed: {}", action, e))
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(BridgeError::AuthFailure(format!(
                "{} request failed: {} {} - {}",
                action,
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                preview(&text, self.error_preview_chars)
            )));
        }

        serde_json::from_str(&text).map_err(|_| {
            BridgeError::AuthFailure(format!(
                "{} response is not valid JSON: {}",
                action,
                preview(&text, TOKEN_PREVIEW_CHARS)
            ))
        })
    }
}

fn extract_tokens(
    payload: &Value,
    smart: &SmartBearerConfig,
    want_refresh_token: bool,
) -> Result<IssuedTokens> {
    let token = get_value_by_path(payload, &smart.token_path).ok_or_else(|| {
        BridgeError::AuthFailure(format!(
            "token not found at path '{}' in response: {}",
            smart.token_path,
            preview(&payload.to_string(), TOKEN_PREVIEW_CHARS)
        ))
    })?;

    let refresh_token = want_refresh_token
        .then(|| get_value_by_path(payload, &smart.refresh_token_path))
        .flatten()
        .map(str::to_string);

    Ok(IssuedTokens {
        token: token.to_string(),
        refresh_token,
    })
}

/// At most `max_chars` characters, ellipsis included
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, CredentialConfig, CredentialType, NewCredential};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn smart(server: &MockServer, extra: CredentialConfig) -> SmartBearerConfig {
        let config = CredentialConfig {
            login_url: Some(format!("{}/login", server.uri())),
            login_body: Some(json!({"username": "admin", "password": "pw"})),
            ..extra
        };
        Credential::new(NewCredential {
            name: "smart".to_string(),
            credential_type: CredentialType::Bearer,
            api_doc_id: None,
            config,
        })
        .smart_bearer()
        .unwrap()
        .unwrap()
    }

    fn manager() -> TokenManager {
        TokenManager::new(Client::new(), Arc::new(TokenCache::new()), 500)
    }

    #[tokio::test]
    async fn test_login_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"username": "admin", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"jwt": "t-1"}})))
            .expect(1)
            .mount(&server)
            .await;

        let smart = smart(
            &server,
            CredentialConfig {
                token_path: Some("data.jwt".to_string()),
                ..Default::default()
            },
        );
        let tokens = manager();

        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "t-1");
        // Without a validity URL the cached token is reused
        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "t-1");
        assert_eq!(tokens.cache().get("c1").await.unwrap().token, "t-1");
    }

    #[tokio::test]
    async fn test_login_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = manager()
            .login("c1", &smart(&server, CredentialConfig::default()))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"), "{}", message);
        assert!(message.contains("boom"), "{}", message);
    }

    #[tokio::test]
    async fn test_missing_token_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "x"})))
            .mount(&server)
            .await;

        let tokens = manager();
        let err = tokens
            .login("c1", &smart(&server, CredentialConfig::default()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'token'"));
        assert!(tokens.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_validity_probe_reuses_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("Authorization", "Bearer cached"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
            .expect(0)
            .mount(&server)
            .await;

        let smart = smart(
            &server,
            CredentialConfig {
                validity_check_url: Some(format!("{}/me", server.uri())),
                ..Default::default()
            },
        );
        let tokens = manager();
        tokens
            .cache()
            .set(CachedToken::new("c1", "cached".to_string(), None))
            .await;

        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "cached");
        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_invalid_probe_uses_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .and(body_json(json!({"refresh": "r-1", "client": "cli"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t-2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t-login"})))
            .expect(0)
            .mount(&server)
            .await;

        let smart = smart(
            &server,
            CredentialConfig {
                validity_check_url: Some(format!("{}/me", server.uri())),
                refresh_url: Some(format!("{}/refresh", server.uri())),
                refresh_token_field: Some("refresh".to_string()),
                refresh_body: Some(json!({"client": "cli"})),
                ..Default::default()
            },
        );
        let tokens = manager();
        tokens
            .cache()
            .set(CachedToken::new("c1", "old".to_string(), Some("r-1".to_string())))
            .await;

        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "t-2");
        let entry = tokens.cache().get("c1").await.unwrap();
        assert_eq!(entry.refresh_token.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_refresh_failure_falls_back_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "t-login", "refreshToken": "r-2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let smart = smart(
            &server,
            CredentialConfig {
                refresh_url: Some(format!("{}/refresh", server.uri())),
                ..Default::default()
            },
        );
        let tokens = manager();
        let stale = CachedToken::new("c1", "old".to_string(), Some("r-1".to_string()));

        assert_eq!(tokens.renew("c1", &smart, Some(stale)).await.unwrap(), "t-login");
        let entry = tokens.cache().get("c1").await.unwrap();
        assert_eq!(entry.refresh_token.as_deref(), Some("r-2"));
    }

    #[tokio::test]
    async fn test_test_login_does_not_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .mount(&server)
            .await;

        let smart = smart(
            &server,
            CredentialConfig {
                login_method: Some("GET".to_string()),
                ..Default::default()
            },
        );
        let tokens = manager();

        assert_eq!(tokens.test_login(&smart).await.unwrap(), "t");
        assert!(tokens.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_unreachable_probe_triggers_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
            .expect(1)
            .mount(&server)
            .await;

        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_url = format!("http://{}/me", closed.local_addr().unwrap());
        drop(closed);

        let smart = smart(
            &server,
            CredentialConfig {
                validity_check_url: Some(dead_url),
                ..Default::default()
            },
        );
        let tokens = manager();
        tokens
            .cache()
            .set(CachedToken::new("c1", "old".to_string(), None))
            .await;

        assert_eq!(tokens.obtain_token("c1", &smart).await.unwrap(), "new");
        assert_eq!(tokens.cache().get("c1").await.unwrap().token, "new");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("abcdef", 5), "ab...");
        assert_eq!(preview("abc", 3), "abc");

        let long = "x".repeat(500);
        assert_eq!(preview(&long, TOKEN_PREVIEW_CHARS).chars().count(), TOKEN_PREVIEW_CHARS);
    }
}
