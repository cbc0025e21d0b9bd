//! # bridge-core
//!
//! Core functionality for api-bridge:
//! - API doc registry whose base URLs double as the outbound URL whitelist
//! - Credential store with per-type admission rules
//! - Smart Bearer token lifecycle (login, validity probe, refresh) over an in-memory cache
//! - Request executor with a single retry on rejected tokens

pub mod apidoc;
pub mod auth;
pub mod credential;
pub mod error;
pub mod http;
pub mod settings;
pub mod storage;
pub mod whitelist;
mod gateway;
mod merge;

pub use error::{BridgeError, Result};
pub use gateway::{ApiCallRequest, CallOutcome, CallResponse, Gateway, RawApiCallRequest};
pub use apidoc::{ApiDoc, ApiDocRegistry, EndpointHit};
pub use auth::{CachedToken, TokenCache, TokenManager};
pub use credential::{
    AuthScheme, Credential, CredentialConfig, CredentialManager, CredentialType, CredentialUpdate,
    CustomHeader, NewCredential, SmartBearerConfig,
};
pub use http::{ApiResponse, OutboundRequest, RequestExecutor, Timing};
pub use settings::{default_data_dir, Settings, SettingsManager};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use whitelist::WhitelistMatch;
