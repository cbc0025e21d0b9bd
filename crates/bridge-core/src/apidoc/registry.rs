//! API doc registry
//!
//! Keeps every registered document in memory (in registration order) and
//! mirrors changes to storage.

use indexmap::IndexMap;
use openapi_parser::{Endpoint, EndpointSearch, HttpMethod, OpenApiParser, ParsedDoc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{ApiDoc, EndpointHit, StoredApiDoc};
use crate::error::{BridgeError, Result};
use crate::storage::Storage;

/// Storage key prefix for API docs
const APIDOC_PREFIX: &str = "apidoc:";

/// Registry of API documents
pub struct ApiDocRegistry {
    storage: Arc<dyn Storage>,
    docs: RwLock<IndexMap<String, StoredApiDoc>>,
}

impl ApiDocRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            docs: RwLock::new(IndexMap::new()),
        }
    }

    fn storage_key(id: &str) -> String {
        format!("{}{}", APIDOC_PREFIX, id)
    }

    /// Load all stored docs into memory
    pub async fn load(&self) -> Result<()> {
        let keys = self.storage.list_keys(APIDOC_PREFIX).await?;
        let mut loaded = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(data) = self.storage.retrieve(&key).await? {
                match serde_json::from_value::<StoredApiDoc>(data) {
                    Ok(stored) => loaded.push(stored),
                    Err(e) => warn!("Skipping unreadable API doc {}: {}", key, e),
                }
            }
        }
        loaded.sort_by_key(|s| s.doc.created_at);

        let mut docs = self.docs.write().await;
        docs.clear();
        for stored in loaded {
            docs.insert(stored.doc.id.clone(), stored);
        }

        info!("Loaded {} API docs", docs.len());
        Ok(())
    }

    /// Fetch a document from `url`, parse and register it
    pub async fn add_from_url(
        &self,
        url: &str,
        name: Option<String>,
        base_url: Option<String>,
    ) -> Result<ApiDoc> {
        let parsed = OpenApiParser::fetch_and_parse(url).await?;
        self.register(parsed, name, Some(url.to_string()), base_url).await
    }

    /// Parse inline JSON/YAML content and register it
    pub async fn add_from_content(
        &self,
        content: &str,
        name: Option<String>,
        base_url: Option<String>,
    ) -> Result<ApiDoc> {
        let parsed = OpenApiParser::parse(content)?;
        self.register(parsed, name, None, base_url).await
    }

    async fn register(
        &self,
        parsed: ParsedDoc,
        name: Option<String>,
        source_url: Option<String>,
        base_url_override: Option<String>,
    ) -> Result<ApiDoc> {
        let base_url = base_url_override
            .or_else(|| parsed.base_url.clone())
            .ok_or_else(|| {
                BridgeError::InvalidSpec(format!(
                    "'{}' does not declare a server URL; pass baseUrl explicitly",
                    parsed.title
                ))
            })?;
        let base_url = normalize_base_url(&base_url)?;

        let stored = StoredApiDoc::from_parsed(parsed, name, source_url, base_url);
        let doc = stored.doc.clone();

        self.storage
            .store(&Self::storage_key(&doc.id), serde_json::to_value(&stored)?)
            .await?;
        self.docs.write().await.insert(doc.id.clone(), stored);

        info!(
            "Registered API doc '{}' ({} endpoints) at {}",
            doc.name, doc.endpoint_count, doc.base_url
        );
        Ok(doc)
    }

    /// Remove a doc by id
    pub async fn remove(&self, id: &str) -> Result<ApiDoc> {
        let mut docs = self.docs.write().await;
        if !docs.contains_key(id) {
            return Err(BridgeError::ApiDocNotFound(id.to_string()));
        }
        self.storage.delete(&Self::storage_key(id)).await?;
        let removed = docs
            .shift_remove(id)
            .ok_or_else(|| BridgeError::ApiDocNotFound(id.to_string()))?;
        drop(docs);

        info!("Removed API doc: {}", id);
        Ok(removed.doc)
    }

    pub async fn get(&self, id: &str) -> Option<ApiDoc> {
        self.docs.read().await.get(id).map(|s| s.doc.clone())
    }

    /// Get a doc by id, failing when it does not exist
    pub async fn require(&self, id: &str) -> Result<ApiDoc> {
        self.get(id)
            .await
            .ok_or_else(|| BridgeError::ApiDocNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<ApiDoc> {
        self.docs.read().await.values().map(|s| s.doc.clone()).collect()
    }

    /// Base URLs of every registered doc, in registration order
    pub async fn whitelisted_base_urls(&self) -> Vec<String> {
        self.docs
            .read()
            .await
            .values()
            .map(|s| s.doc.base_url.clone())
            .collect()
    }

    /// Endpoint of doc `id` serving `method` on `path` (template or concrete)
    pub async fn endpoint_info(
        &self,
        id: &str,
        path: &str,
        method: HttpMethod,
    ) -> Result<Option<Endpoint>> {
        let docs = self.docs.read().await;
        let stored = docs
            .get(id)
            .ok_or_else(|| BridgeError::ApiDocNotFound(id.to_string()))?;

        // Exact template match first, then concrete-path match
        let found = stored
            .endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
            .or_else(|| stored.endpoints.iter().find(|e| e.matches(path, method)))
            .cloned();

        debug!("Endpoint lookup {} {} in {}: {}", method, path, id, found.is_some());
        Ok(found)
    }

    /// Keyword search across all docs, or only `api_doc_id`
    pub async fn search(
        &self,
        query: &str,
        api_doc_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<EndpointHit>> {
        let docs = self.docs.read().await;
        if let Some(id) = api_doc_id {
            if !docs.contains_key(id) {
                return Err(BridgeError::ApiDocNotFound(id.to_string()));
            }
        }

        let search = EndpointSearch::new(query);
        if search.is_empty() {
            return Err(BridgeError::InvalidRequest(
                "search query must contain at least one word".to_string(),
            ));
        }

        let mut hits: Vec<EndpointHit> = docs
            .values()
            .filter(|s| api_doc_id.map_or(true, |id| s.doc.id == id))
            .flat_map(|s| {
                search
                    .rank(&s.endpoints, limit)
                    .into_iter()
                    .map(move |m| EndpointHit {
                        api_doc_id: s.doc.id.clone(),
                        api_doc_name: s.doc.name.clone(),
                        score: m.score,
                        endpoint: m.endpoint.clone(),
                    })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Validate a base URL and strip trailing slashes
fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BridgeError::InvalidUrl(format!(
            "{}: base URL must use http or https",
            raw
        )));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const PETSTORE: &str = r#"
openapi: 3.0.0
info:
  title: Petstore
  version: 1.0.0
servers:
  - url: https://petstore.example.com/v1/
paths:
  /pets:
    get:
      operationId: listPets
      summary: List all pets
    post:
      operationId: createPet
      summary: Create a pet
  /pets/{petId}:
    get:
      operationId: showPetById
      summary: Info for a specific pet
"#;

    const NO_SERVERS: &str = r#"{
  "openapi": "3.0.0",
  "info": {"title": "Bare", "version": "0.1"},
  "paths": {"/health": {"get": {"summary": "Health"}}}
}"#;

    #[tokio::test]
    async fn test_add_list_remove() {
        let storage = Arc::new(MemoryStorage::new());
        let registry = ApiDocRegistry::new(storage.clone());

        let doc = registry.add_from_content(PETSTORE, None, None).await.unwrap();
        assert_eq!(doc.name, "Petstore");
        assert_eq!(doc.base_url, "https://petstore.example.com/v1");
        assert_eq!(doc.endpoint_count, 3);

        // Survives a reload from storage
        let reloaded = ApiDocRegistry::new(storage);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.list().await.len(), 1);
        assert_eq!(
            reloaded.whitelisted_base_urls().await,
            vec!["https://petstore.example.com/v1".to_string()]
        );

        reloaded.remove(&doc.id).await.unwrap();
        assert!(reloaded.list().await.is_empty());
        assert!(matches!(
            reloaded.remove(&doc.id).await,
            Err(BridgeError::ApiDocNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_base_url_override_and_missing() {
        let registry = ApiDocRegistry::new(Arc::new(MemoryStorage::new()));

        assert!(matches!(
            registry.add_from_content(NO_SERVERS, None, None).await,
            Err(BridgeError::InvalidSpec(_))
        ));

        let doc = registry
            .add_from_content(
                NO_SERVERS,
                Some("local".to_string()),
                Some("http://localhost:3000/".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(doc.name, "local");
        assert_eq!(doc.base_url, "http://localhost:3000");

        assert!(registry
            .add_from_content(NO_SERVERS, None, Some("ftp://files".to_string()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_endpoint_info() {
        let registry = ApiDocRegistry::new(Arc::new(MemoryStorage::new()));
        let doc = registry.add_from_content(PETSTORE, None, None).await.unwrap();

        let endpoint = registry
            .endpoint_info(&doc.id, "/pets/42", HttpMethod::Get)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(endpoint.operation_id.as_deref(), Some("showPetById"));

        assert!(registry
            .endpoint_info(&doc.id, "/pets/42", HttpMethod::Delete)
            .await
            .unwrap()
            .is_none());
        assert!(registry
            .endpoint_info("missing", "/pets", HttpMethod::Get)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_search() {
        let registry = ApiDocRegistry::new(Arc::new(MemoryStorage::new()));
        let doc = registry.add_from_content(PETSTORE, None, None).await.unwrap();

        let hits = registry.search("create pet", None, 10).await.unwrap();
        assert_eq!(hits[0].endpoint.operation_id.as_deref(), Some("createPet"));
        assert_eq!(hits[0].api_doc_id, doc.id);

        let hits = registry.search("pets", Some(&doc.id), 2).await.unwrap();
        assert_eq!(hits.len(), 2);

        assert!(registry.search("  ", None, 10).await.is_err());
    }
}
