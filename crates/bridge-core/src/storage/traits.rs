//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Key/value persistence for JSON records
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a value under `key`, replacing any previous value
    async fn store(&self, key: &str, value: Value) -> Result<()>;

    /// Retrieve a value by key
    async fn retrieve(&self, key: &str) -> Result<Option<Value>>;

    /// Delete a value by key (no-op when absent)
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all keys with a given prefix, sorted
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
