//! API doc type definitions

use chrono::{DateTime, Utc};
use openapi_parser::{Endpoint, ParsedDoc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered API document metadata (safe to list)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDoc {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Base URL of the API, without trailing slash; also a whitelist entry
    pub base_url: String,
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub endpoint_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An API doc together with its endpoint list, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredApiDoc {
    pub doc: ApiDoc,
    pub endpoints: Vec<Endpoint>,
}

impl StoredApiDoc {
    pub(crate) fn from_parsed(
        parsed: ParsedDoc,
        name: Option<String>,
        source_url: Option<String>,
        base_url: String,
    ) -> Self {
        let now = Utc::now();
        let doc = ApiDoc {
            id: Uuid::new_v4().to_string(),
            name: name.unwrap_or_else(|| parsed.title.clone()),
            source_url,
            base_url,
            title: parsed.title,
            version: parsed.version,
            description: parsed.description,
            endpoint_count: parsed.endpoints.len(),
            created_at: now,
            updated_at: now,
        };

        Self {
            doc,
            endpoints: parsed.endpoints,
        }
    }
}

/// An endpoint search hit across registered docs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHit {
    pub api_doc_id: String,
    pub api_doc_name: String,
    pub score: u32,
    #[serde(flatten)]
    pub endpoint: Endpoint,
}
