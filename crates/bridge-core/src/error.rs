//! Error types for bridge-core

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A credential is missing a field its type requires
    #[error("Invalid credential configuration: {0}")]
    Configuration(String),

    /// Login, refresh or token extraction failed
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Test login of a Smart Bearer credential failed at admission
    #[error("Credential verification failed: {0}")]
    VerificationFailed(String),

    /// DNS, connect or timeout failure talking to a remote host
    #[error("Network error: {0}")]
    Network(String),

    #[error("URL is not whitelisted: {url}")]
    NotWhitelisted { url: String, whitelist: Vec<String> },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("API doc not found: {0}")]
    ApiDocNotFound(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Invalid API document: {0}")]
    InvalidSpec(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BridgeError {
    /// Human-readable next step for the caller, if there is an obvious one
    pub fn suggestion(&self) -> Option<String> {
        match self {
            BridgeError::Configuration(_) => Some(
                "Fix the credential configuration and try again.".to_string(),
            ),
            BridgeError::AuthFailure(_) => Some(
                "Check the credential's login settings (loginUrl, loginBody, tokenPath) or update it with update_credential.".to_string(),
            ),
            BridgeError::VerificationFailed(_) => Some(
                "Check loginUrl, loginBody and tokenPath, or pass skipValidityCheck: true to save the credential without logging in.".to_string(),
            ),
            BridgeError::Network(_) => Some(
                "Verify the target server is running and reachable from this machine.".to_string(),
            ),
            BridgeError::NotWhitelisted { whitelist, .. } => Some(if whitelist.is_empty() {
                "No API docs are registered. Register one with add_api_doc so its base URL becomes whitelisted.".to_string()
            } else {
                format!(
                    "Only URLs under a registered API base URL can be called. Current whitelist: {}",
                    whitelist.join(", ")
                )
            }),
            BridgeError::CredentialNotFound(_) => {
                Some("Use list_credentials to see the available credential ids.".to_string())
            }
            BridgeError::ApiDocNotFound(_) => {
                Some("Use list_api_docs to see the registered API docs.".to_string())
            }
            BridgeError::EndpointNotFound(_) => {
                Some("Use search_endpoints to find the endpoint's exact path and method.".to_string())
            }
            _ => None,
        }
    }
}

impl From<openapi_parser::ParseError> for BridgeError {
    fn from(err: openapi_parser::ParseError) -> Self {
        BridgeError::InvalidSpec(err.to_string())
    }
}
