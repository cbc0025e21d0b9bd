//! Injects credential material into outbound request headers

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;

use super::lifecycle::TokenManager;
use crate::credential::AuthScheme;
use crate::error::Result;

impl AuthScheme {
    /// Add this scheme's auth headers to `headers`.
    ///
    /// Only the Smart Bearer variant performs I/O (token acquisition).
    pub async fn apply(
        &self,
        credential_id: &str,
        headers: &mut HashMap<String, String>,
        tokens: &TokenManager,
    ) -> Result<()> {
        match self {
            AuthScheme::ApiKey { header, value } => {
                headers.insert(header.clone(), value.clone());
            }
            AuthScheme::StaticBearer { token } => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            AuthScheme::SmartBearer(smart) => {
                let token = tokens.obtain_token(credential_id, smart).await?;
                headers.insert(smart.token_header.clone(), smart.header_value(&token));
            }
            AuthScheme::Basic { username, password } => {
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                headers.insert("Authorization".to_string(), format!("Basic {}", encoded));
            }
            AuthScheme::OAuth2 { access_token } => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", access_token));
            }
            AuthScheme::Custom { headers: extra } => {
                headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            AuthScheme::CustomHeaders(list) => {
                for header in list {
                    headers.insert(header.name.clone(), header.value.clone());
                }
            }
            AuthScheme::Unconfigured => {}
        }
        Ok(())
    }
}
