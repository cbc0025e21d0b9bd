//! Type definitions for parsed API documents

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ParseError;

/// HTTP methods an endpoint can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Path-item keys in declaration order
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Key used for this method inside a path item
    pub(crate) fn key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::InvalidFormat(format!("unknown HTTP method '{}'", s)))
    }
}

/// Parameter location in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// Swagger 2.0 body parameter
    Body,
    /// Swagger 2.0 form parameter
    FormData,
}

impl ParameterLocation {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            _ => None,
        }
    }
}

/// A declared endpoint parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

/// A single endpoint (method + path template) of an API document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub method: HttpMethod,
    /// Path template, e.g. "/users/{id}"
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<EndpointParameter>,
    /// JSON schema of the request body, if one is declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<serde_json::Value>,
}

impl Endpoint {
    /// Whether this endpoint serves `method` on `path`.
    ///
    /// `path` may be the template itself or a concrete path; template
    /// segments like `{id}` match any single non-empty segment.
    pub fn matches(&self, path: &str, method: HttpMethod) -> bool {
        if self.method != method {
            return false;
        }

        let requested = normalize_path(path);
        let template = normalize_path(&self.path);
        if requested == template {
            return true;
        }

        let requested: Vec<&str> = requested.split('/').collect();
        let template: Vec<&str> = template.split('/').collect();
        requested.len() == template.len()
            && template.iter().zip(&requested).all(|(t, r)| {
                (t.starts_with('{') && t.ends_with('}') && !r.is_empty()) || t == r
            })
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Flavour of the parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocFormat {
    OpenApi3,
    Swagger2,
}

/// Parsed API document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDoc {
    pub format: DocFormat,
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    /// Base URL derived from `servers` or `host`/`basePath`
    pub base_url: Option<String>,
    pub endpoints: Vec<Endpoint>,
}
