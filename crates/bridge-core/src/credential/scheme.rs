//! Resolved authentication schemes

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;

use super::types::{Credential, CredentialType, CustomHeader};
use crate::error::{BridgeError, Result};

pub const DEFAULT_TOKEN_PATH: &str = "token";
pub const DEFAULT_TOKEN_HEADER: &str = "Authorization";
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";
pub const DEFAULT_INVALID_STATUS_CODES: [u16; 2] = [401, 403];
pub const DEFAULT_REFRESH_TOKEN_PATH: &str = "refreshToken";
pub const DEFAULT_REFRESH_TOKEN_FIELD: &str = "refreshToken";

/// How a credential authenticates a request, with defaults applied
#[derive(Debug, Clone)]
pub enum AuthScheme {
    ApiKey { header: String, value: String },
    StaticBearer { token: String },
    SmartBearer(SmartBearerConfig),
    Basic { username: String, password: String },
    OAuth2 { access_token: String },
    Custom { headers: HashMap<String, String> },
    CustomHeaders(Vec<CustomHeader>),
    /// Required fields are missing; nothing is injected
    Unconfigured,
}

/// Login-driven bearer configuration
#[derive(Debug, Clone)]
pub struct SmartBearerConfig {
    pub login_url: String,
    pub login_method: Method,
    pub login_body: Option<Value>,
    pub login_headers: HashMap<String, String>,
    pub token_path: String,
    pub token_header: String,
    pub token_prefix: String,
    pub invalid_status_codes: Vec<u16>,
    pub validity_check_url: Option<String>,
    pub validity_check_method: Method,
    pub refresh_url: Option<String>,
    pub refresh_method: Method,
    pub refresh_token_path: String,
    pub refresh_token_field: String,
    pub refresh_body: Option<Value>,
}

impl SmartBearerConfig {
    /// Whether `status` means the attached token was rejected
    pub fn is_invalid_status(&self, status: u16) -> bool {
        self.invalid_status_codes.contains(&status)
    }

    /// Header value carrying `token`
    pub fn header_value(&self, token: &str) -> String {
        format!("{}{}", self.token_prefix, token)
    }
}

/// Parse an HTTP method name, case-insensitively
pub fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.trim().to_uppercase().as_bytes())
        .map_err(|_| BridgeError::Configuration(format!("invalid HTTP method '{}'", raw)))
}

fn method_or(raw: Option<&str>, default: Method) -> Result<Method> {
    raw.map(parse_method).transpose().map(|m| m.unwrap_or(default))
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

impl Credential {
    /// Resolve the scheme this credential authenticates with.
    ///
    /// Fails only when a configured HTTP method does not parse.
    pub fn scheme(&self) -> Result<AuthScheme> {
        let config = &self.config;

        let scheme = match self.credential_type {
            CredentialType::ApiKey => match (&config.api_key_header, &config.api_key) {
                (Some(header), Some(value)) => AuthScheme::ApiKey {
                    header: header.clone(),
                    value: value.clone(),
                },
                _ => AuthScheme::Unconfigured,
            },
            CredentialType::Bearer => match (&config.login_url, &config.token) {
                (Some(login_url), _) => AuthScheme::SmartBearer(SmartBearerConfig {
                    login_url: login_url.clone(),
                    login_method: method_or(config.login_method.as_deref(), Method::POST)?,
                    login_body: config.login_body.clone(),
                    login_headers: config.login_headers.clone().unwrap_or_default(),
                    token_path: or_default(&config.token_path, DEFAULT_TOKEN_PATH),
                    token_header: or_default(&config.token_header, DEFAULT_TOKEN_HEADER),
                    token_prefix: or_default(&config.token_prefix, DEFAULT_TOKEN_PREFIX),
                    invalid_status_codes: config
                        .invalid_status_codes
                        .clone()
                        .unwrap_or_else(|| DEFAULT_INVALID_STATUS_CODES.to_vec()),
                    validity_check_url: config.validity_check_url.clone(),
                    validity_check_method: method_or(
                        config.validity_check_method.as_deref(),
                        Method::GET,
                    )?,
                    refresh_url: config.refresh_url.clone(),
                    refresh_method: method_or(config.refresh_method.as_deref(), Method::POST)?,
                    refresh_token_path: or_default(
                        &config.refresh_token_path,
                        DEFAULT_REFRESH_TOKEN_PATH,
                    ),
                    refresh_token_field: or_default(
                        &config.refresh_token_field,
                        DEFAULT_REFRESH_TOKEN_FIELD,
                    ),
                    refresh_body: config.refresh_body.clone(),
                }),
                (None, Some(token)) => AuthScheme::StaticBearer {
                    token: token.clone(),
                },
                (None, None) => AuthScheme::Unconfigured,
            },
            CredentialType::Basic => match (&config.username, &config.password) {
                (Some(username), Some(password)) => AuthScheme::Basic {
                    username: username.clone(),
                    password: password.clone(),
                },
                _ => AuthScheme::Unconfigured,
            },
            CredentialType::OAuth2 => match &config.access_token {
                Some(access_token) => AuthScheme::OAuth2 {
                    access_token: access_token.clone(),
                },
                None => AuthScheme::Unconfigured,
            },
            CredentialType::Custom => match &config.headers {
                Some(headers) => AuthScheme::Custom {
                    headers: headers.clone(),
                },
                None => AuthScheme::Unconfigured,
            },
            CredentialType::CustomHeaders => match &config.custom_headers {
                Some(headers) => AuthScheme::CustomHeaders(headers.clone()),
                None => AuthScheme::Unconfigured,
            },
        };

        Ok(scheme)
    }

    /// Smart Bearer settings, if this is a login-driven bearer credential
    pub fn smart_bearer(&self) -> Result<Option<SmartBearerConfig>> {
        Ok(match self.scheme()? {
            AuthScheme::SmartBearer(smart) => Some(smart),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialConfig, NewCredential};

    fn credential(credential_type: CredentialType, config: CredentialConfig) -> Credential {
        Credential::new(NewCredential {
            name: "test".to_string(),
            credential_type,
            api_doc_id: None,
            config,
        })
    }

    #[test]
    fn test_smart_bearer_defaults() {
        let cred = credential(
            CredentialType::Bearer,
            CredentialConfig {
                login_url: Some("http://localhost/login".to_string()),
                ..Default::default()
            },
        );

        let smart = cred.smart_bearer().unwrap().unwrap();
        assert_eq!(smart.login_method, Method::POST);
        assert_eq!(smart.token_path, "token");
        assert_eq!(smart.token_header, "Authorization");
        assert_eq!(smart.header_value("abc"), "Bearer abc");
        assert!(smart.is_invalid_status(401));
        assert!(smart.is_invalid_status(403));
        assert!(!smart.is_invalid_status(500));
        assert_eq!(smart.validity_check_method, Method::GET);
        assert_eq!(smart.refresh_token_path, "refreshToken");
    }

    #[test]
    fn test_login_url_wins_over_static_token() {
        let cred = credential(
            CredentialType::Bearer,
            CredentialConfig {
                token: Some("static".to_string()),
                login_url: Some("http://localhost/login".to_string()),
                login_method: Some("get".to_string()),
                ..Default::default()
            },
        );

        match cred.scheme().unwrap() {
            AuthScheme::SmartBearer(smart) => assert_eq!(smart.login_method, Method::GET),
            other => panic!("unexpected scheme: {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_resolve_unconfigured() {
        let cred = credential(
            CredentialType::ApiKey,
            CredentialConfig {
                api_key: Some("k".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(cred.scheme().unwrap(), AuthScheme::Unconfigured));

        let cred = credential(CredentialType::Bearer, CredentialConfig::default());
        assert!(matches!(cred.scheme().unwrap(), AuthScheme::Unconfigured));
    }

    #[test]
    fn test_bad_method_rejected() {
        let cred = credential(
            CredentialType::Bearer,
            CredentialConfig {
                login_url: Some("http://localhost/login".to_string()),
                login_method: Some("PO ST".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(cred.scheme(), Err(BridgeError::Configuration(_))));
    }
}
