//! Credential type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of authentication a credential carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialType {
    /// Static key sent in a named header
    #[serde(rename = "apiKey")]
    ApiKey,
    /// Static bearer token, or Smart Bearer when `loginUrl` is set
    #[serde(rename = "bearer")]
    Bearer,
    /// HTTP Basic (username:password)
    #[serde(rename = "basic")]
    Basic,
    /// Pre-issued OAuth2 access token
    #[serde(rename = "oauth2")]
    OAuth2,
    /// Free-form header map
    #[serde(rename = "custom")]
    Custom,
    /// Up to five named headers
    #[serde(rename = "customHeaders")]
    CustomHeaders,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::ApiKey => "apiKey",
            CredentialType::Bearer => "bearer",
            CredentialType::Basic => "basic",
            CredentialType::OAuth2 => "oauth2",
            CredentialType::Custom => "custom",
            CredentialType::CustomHeaders => "customHeaders",
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{name, value}` header of a `customHeaders` credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

/// Union of every configuration field; which ones matter depends on the
/// credential type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialConfig {
    // apiKey
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_header: Option<String>,

    // bearer (static)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    // basic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    // oauth2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    // custom
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    // customHeaders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<CustomHeader>>,

    // Smart Bearer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_status_codes: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_check_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_check_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_body: Option<Value>,
}

/// A stored credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// UUID v4, immutable
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// API doc this credential is the default for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_doc_id: Option<String>,
    pub config: CredentialConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(input: NewCredential) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            credential_type: input.credential_type,
            api_doc_id: input.api_doc_id,
            config: input.config,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy with every secret masked, safe to show to the agent
    pub fn masked(&self) -> Credential {
        let mut masked = self.clone();
        let config = &mut masked.config;

        for secret in [
            &mut config.api_key,
            &mut config.token,
            &mut config.password,
            &mut config.access_token,
            &mut config.client_secret,
            &mut config.refresh_token,
        ] {
            if let Some(value) = secret.as_mut() {
                *value = mask_secret(value);
            }
        }

        for headers in [&mut config.headers, &mut config.login_headers] {
            if let Some(headers) = headers.as_mut() {
                for value in headers.values_mut() {
                    *value = mask_secret(value);
                }
            }
        }

        if let Some(custom) = config.custom_headers.as_mut() {
            for header in custom.iter_mut() {
                header.value = mask_secret(&header.value);
            }
        }

        for body in [&mut config.login_body, &mut config.refresh_body] {
            if body.is_some() {
                *body = Some(Value::String("[REDACTED]".to_string()));
            }
        }

        masked
    }
}

/// First four characters followed by "..."; short secrets are hidden entirely
pub(crate) fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}...", visible)
}

/// Input for creating a credential
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    #[serde(default)]
    pub api_doc_id: Option<String>,
    #[serde(default)]
    pub config: CredentialConfig,
}

/// Partial update for an existing credential.
///
/// `config` is deep-merged into the stored configuration; a `null` value
/// clears the corresponding field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_doc_id: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}
