//! In-memory token cache

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A token obtained for a Smart Bearer credential - zeroed when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CachedToken {
    #[zeroize(skip)]
    pub credential_id: String,
    pub token: String,
    pub refresh_token: Option<String>,
    /// Epoch milliseconds
    #[zeroize(skip)]
    pub obtained_at: i64,
}

impl CachedToken {
    pub fn new(credential_id: &str, token: String, refresh_token: Option<String>) -> Self {
        Self {
            credential_id: credential_id.to_string(),
            token,
            refresh_token,
            obtained_at: Utc::now().timestamp_millis(),
        }
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("credential_id", &self.credential_id)
            .field("token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Process-wide map from credential id to its current token.
///
/// Not persisted and without TTL; entries disappear only when evicted.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, credential_id: &str) -> Option<CachedToken> {
        self.entries.read().await.get(credential_id).cloned()
    }

    /// Insert or overwrite the entry for `entry.credential_id`
    pub async fn set(&self, entry: CachedToken) {
        self.entries
            .write()
            .await
            .insert(entry.credential_id.clone(), entry);
    }

    /// Remove and return the entry for `credential_id`
    pub async fn delete(&self, credential_id: &str) -> Option<CachedToken> {
        self.entries.write().await.remove(credential_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
