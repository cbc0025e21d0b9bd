//! Credential manager for CRUD operations

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{Credential, CredentialConfig, CredentialUpdate};
use crate::error::{BridgeError, Result};
use crate::merge::merge_deep;
use crate::storage::Storage;

/// Storage key prefix for credentials
const CREDENTIAL_PREFIX: &str = "credential:";

/// Credential manager
///
/// Persists credentials as JSON records; admission checks are the caller's
/// job (see `Gateway`).
pub struct CredentialManager {
    storage: Arc<dyn Storage>,
}

impl CredentialManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn storage_key(id: &str) -> String {
        format!("{}{}", CREDENTIAL_PREFIX, id)
    }

    /// Get a credential by ID
    pub async fn get(&self, id: &str) -> Result<Option<Credential>> {
        match self.storage.retrieve(&Self::storage_key(id)).await? {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    /// Get a credential by ID, failing when it does not exist
    pub async fn require(&self, id: &str) -> Result<Credential> {
        self.get(id)
            .await?
            .ok_or_else(|| BridgeError::CredentialNotFound(id.to_string()))
    }

    /// List all credentials, oldest first
    pub async fn list(&self) -> Result<Vec<Credential>> {
        let keys = self.storage.list_keys(CREDENTIAL_PREFIX).await?;
        let mut credentials = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(data) = self.storage.retrieve(&key).await? {
                credentials.push(serde_json::from_value::<Credential>(data)?);
            }
        }

        credentials.sort_by_key(|c| c.created_at);
        Ok(credentials)
    }

    /// First credential bound to `api_doc_id`
    pub async fn find_for_doc(&self, api_doc_id: &str) -> Result<Option<Credential>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|c| c.api_doc_id.as_deref() == Some(api_doc_id)))
    }

    /// Persist a credential (insert or overwrite)
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let value = serde_json::to_value(credential)?;
        self.storage
            .store(&Self::storage_key(&credential.id), value)
            .await?;

        debug!("Saved credential: {}", credential.id);
        Ok(())
    }

    /// Clear the doc binding of every credential bound to `api_doc_id`
    pub async fn unbind_doc(&self, api_doc_id: &str) -> Result<usize> {
        let mut unbound = 0;
        for mut credential in self.list().await? {
            if credential.api_doc_id.as_deref() != Some(api_doc_id) {
                continue;
            }
            credential.api_doc_id = None;
            credential.updated_at = Utc::now();
            self.save(&credential).await?;
            unbound += 1;
        }
        Ok(unbound)
    }

    /// Delete a credential
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.get(id).await?.is_none() {
            return Err(BridgeError::CredentialNotFound(id.to_string()));
        }

        self.storage.delete(&Self::storage_key(id)).await?;

        info!("Deleted credential: {}", id);
        Ok(())
    }
}

impl CredentialUpdate {
    /// Apply this update to `credential` in memory, bumping `updatedAt`
    pub fn apply_to(&self, credential: &mut Credential) -> Result<()> {
        if let Some(name) = &self.name {
            credential.name = name.clone();
        }
        if let Some(api_doc_id) = &self.api_doc_id {
            credential.api_doc_id = Some(api_doc_id.clone()).filter(|id| !id.is_empty());
        }
        if let Some(patch) = &self.config {
            if !patch.is_object() {
                return Err(BridgeError::InvalidRequest(
                    "credential config update must be a JSON object".to_string(),
                ));
            }
            let current = serde_json::to_value(&credential.config)?;
            let merged = strip_nulls(merge_deep(&current, patch));
            credential.config = serde_json::from_value::<CredentialConfig>(merged)?;
        }

        credential.updated_at = Utc::now();
        Ok(())
    }
}

/// Drop object members set to `null` so cleared fields deserialize as absent
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}
