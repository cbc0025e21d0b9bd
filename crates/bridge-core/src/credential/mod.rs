//! Credential management

mod manager;
mod scheme;
mod types;
mod validation;

pub use manager::CredentialManager;
pub use scheme::{parse_method, AuthScheme, SmartBearerConfig};
pub use types::{Credential, CredentialConfig, CredentialType, CredentialUpdate, CustomHeader, NewCredential};
pub use validation::{validate_credential, MAX_CUSTOM_HEADERS};
