//! Credential admission rules

use reqwest::Method;
use url::Url;

use super::scheme::AuthScheme;
use super::types::{Credential, CredentialType};
use crate::error::{BridgeError, Result};

/// Maximum number of entries in a `customHeaders` credential
pub const MAX_CUSTOM_HEADERS: usize = 5;

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn require(value: &Option<String>, field: &str, credential_type: CredentialType) -> Result<()> {
    if present(value) {
        Ok(())
    } else {
        Err(BridgeError::Configuration(format!(
            "{} credentials require '{}'",
            credential_type, field
        )))
    }
}

fn require_url(value: &Option<String>, field: &str) -> Result<()> {
    if let Some(raw) = value {
        Url::parse(raw).map_err(|e| {
            BridgeError::Configuration(format!("'{}' is not a valid URL ({}): {}", field, e, raw))
        })?;
    }
    Ok(())
}

/// Check that `credential` carries every field its type requires.
///
/// Does not contact any server; Smart Bearer verification happens separately.
pub fn validate_credential(credential: &Credential) -> Result<()> {
    let config = &credential.config;
    let kind = credential.credential_type;

    if credential.name.trim().is_empty() {
        return Err(BridgeError::Configuration(
            "credential name must not be empty".to_string(),
        ));
    }

    match kind {
        CredentialType::ApiKey => {
            require(&config.api_key, "apiKey", kind)?;
            require(&config.api_key_header, "apiKeyHeader", kind)?;
        }
        CredentialType::Bearer => {
            if !present(&config.token) && !present(&config.login_url) {
                return Err(BridgeError::Configuration(
                    "bearer credentials require either 'token' or 'loginUrl'".to_string(),
                ));
            }
        }
        CredentialType::Basic => {
            require(&config.username, "username", kind)?;
            require(&config.password, "password", kind)?;
        }
        CredentialType::OAuth2 => {
            require(&config.access_token, "accessToken", kind)?;
        }
        CredentialType::Custom => {
            if config.headers.as_ref().map_or(true, |h| h.is_empty()) {
                return Err(BridgeError::Configuration(
                    "custom credentials require at least one entry in 'headers'".to_string(),
                ));
            }
        }
        CredentialType::CustomHeaders => {
            let headers = config.custom_headers.as_deref().unwrap_or_default();
            if headers.is_empty() || headers.len() > MAX_CUSTOM_HEADERS {
                return Err(BridgeError::Configuration(format!(
                    "customHeaders credentials require between 1 and {} headers, got {}",
                    MAX_CUSTOM_HEADERS,
                    headers.len()
                )));
            }
            if headers.iter().any(|h| h.name.trim().is_empty()) {
                return Err(BridgeError::Configuration(
                    "customHeaders entries must have a non-empty name".to_string(),
                ));
            }
        }
    }

    // Method names are checked while resolving the scheme
    if let AuthScheme::SmartBearer(smart) = credential.scheme()? {
        require_url(&config.login_url, "loginUrl")?;
        require_url(&config.validity_check_url, "validityCheckUrl")?;
        require_url(&config.refresh_url, "refreshUrl")?;

        if smart.login_method != Method::GET && smart.login_body.is_none() {
            return Err(BridgeError::Configuration(format!(
                "'loginBody' is required when 'loginUrl' is set (login method {})",
                smart.login_method
            )));
        }

        if let Some(code) = smart
            .invalid_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(BridgeError::Configuration(format!(
                "invalidStatusCodes contains {}, which is not an HTTP status code",
                code
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialConfig, CustomHeader, NewCredential};
    use serde_json::json;
    use std::collections::HashMap;

    fn credential(credential_type: CredentialType, config: CredentialConfig) -> Credential {
        Credential::new(NewCredential {
            name: "test".to_string(),
            credential_type,
            api_doc_id: None,
            config,
        })
    }

    fn custom_headers(n: usize) -> CredentialConfig {
        CredentialConfig {
            custom_headers: Some(
                (0..n)
                    .map(|i| CustomHeader {
                        name: format!("X-H{}", i),
                        value: format!("v{}", i),
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_requires_both_fields() {
        let ok = credential(
            CredentialType::ApiKey,
            CredentialConfig {
                api_key: Some("k".to_string()),
                api_key_header: Some("X-Api-Key".to_string()),
                ..Default::default()
            },
        );
        assert!(validate_credential(&ok).is_ok());

        let missing = credential(
            CredentialType::ApiKey,
            CredentialConfig {
                api_key: Some("k".to_string()),
                ..Default::default()
            },
        );
        let err = validate_credential(&missing).unwrap_err();
        assert!(err.to_string().contains("apiKeyHeader"));
    }

    #[test]
    fn test_bearer_requires_token_or_login_url() {
        assert!(validate_credential(&credential(CredentialType::Bearer, CredentialConfig::default())).is_err());

        let static_token = credential(
            CredentialType::Bearer,
            CredentialConfig {
                token: Some("abc".to_string()),
                ..Default::default()
            },
        );
        assert!(validate_credential(&static_token).is_ok());
    }

    #[test]
    fn test_login_url_requires_body_unless_get() {
        let mut config = CredentialConfig {
            login_url: Some("http://localhost:3000/login".to_string()),
            ..Default::default()
        };
        let err = validate_credential(&credential(CredentialType::Bearer, config.clone())).unwrap_err();
        assert!(err.to_string().contains("loginBody"));

        config.login_method = Some("GET".to_string());
        assert!(validate_credential(&credential(CredentialType::Bearer, config.clone())).is_ok());

        config.login_method = None;
        config.login_body = Some(json!({"user": "a"}));
        assert!(validate_credential(&credential(CredentialType::Bearer, config)).is_ok());
    }

    #[test]
    fn test_invalid_status_codes_range() {
        let config = CredentialConfig {
            login_url: Some("http://localhost:3000/login".to_string()),
            login_body: Some(json!({})),
            invalid_status_codes: Some(vec![401, 42]),
            ..Default::default()
        };
        let err = validate_credential(&credential(CredentialType::Bearer, config)).unwrap_err();
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_custom_headers_count() {
        for n in 1..=5 {
            assert!(validate_credential(&credential(CredentialType::CustomHeaders, custom_headers(n))).is_ok());
        }
        assert!(validate_credential(&credential(CredentialType::CustomHeaders, custom_headers(0))).is_err());
        assert!(validate_credential(&credential(CredentialType::CustomHeaders, custom_headers(6))).is_err());
    }

    #[test]
    fn test_custom_requires_headers() {
        let empty = credential(
            CredentialType::Custom,
            CredentialConfig {
                headers: Some(HashMap::new()),
                ..Default::default()
            },
        );
        assert!(validate_credential(&empty).is_err());

        let ok = credential(
            CredentialType::Custom,
            CredentialConfig {
                headers: Some(HashMap::from([("X-Tenant".to_string(), "acme".to_string())])),
                ..Default::default()
            },
        );
        assert!(validate_credential(&ok).is_ok());
    }
}
